use std::path::PathBuf;
use std::process::ExitCode;

use bulkbench_core::{ConcurrencyModel, StrategyKind};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "bulkbench")]
#[command(about = "PostgreSQL bulk-insert throughput benchmark", long_about = None)]
#[command(version)]
struct Cli {
    /// Extra configuration file, layered above ./config/bulkbench and BULKBENCH_CONFIG
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open one connection and print the server version
    TestConnect,

    /// Create the benchmark table if it does not exist
    CreateTable {
        /// Table to create
        #[arg(long)]
        table: Option<String>,
    },

    /// Drop the benchmark table if it exists
    DropTable {
        /// Table to drop
        #[arg(long)]
        table: Option<String>,
    },

    /// Print the number of rows in the benchmark table
    CountRows {
        /// Table to count
        #[arg(long)]
        table: Option<String>,
    },

    /// Resolve and print the database credentials
    TestCredentials,

    /// Benchmark inserts with one process per worker
    TestMultiprocess(BenchArgs),

    /// Benchmark inserts with worker tasks sharing this process
    TestMultithread(BenchArgs),

    /// Serve batch jobs over stdin/stdout (started by test-multiprocess)
    #[command(hide = true)]
    Worker,
}

/// Parameters shared by both benchmark commands. Unset values come from the
/// `benchmark` configuration section.
#[derive(Args, Debug)]
pub struct BenchArgs {
    /// Target table
    #[arg(long)]
    pub table: Option<String>,

    /// Number of workers (default: CPU count for processes, 4 for threads)
    #[arg(long)]
    pub nworkers: Option<usize>,

    /// Total number of rows to insert
    #[arg(long)]
    pub nrows: Option<u64>,

    /// Rows per batch job
    #[arg(long)]
    pub batch_size: Option<u64>,

    /// Payload filler size in kilobytes
    #[arg(long)]
    pub json_kbs: Option<u32>,

    /// Insert strategy: batched or bulk
    #[arg(long)]
    pub method: Option<StrategyKind>,

    /// Rows per statement for the batched strategy
    #[arg(long)]
    pub page_size: Option<usize>,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::TestConnect => commands::admin::test_connect(config_path).await,
        Commands::CreateTable { table } => {
            commands::admin::create_table(config_path, table).await
        }
        Commands::DropTable { table } => commands::admin::drop_table(config_path, table).await,
        Commands::CountRows { table } => commands::admin::count_rows(config_path, table).await,
        Commands::TestCredentials => commands::admin::test_credentials(config_path).await,
        Commands::TestMultiprocess(args) => {
            commands::bench::run(config_path, args, ConcurrencyModel::Process).await
        }
        Commands::TestMultithread(args) => {
            commands::bench::run(config_path, args, ConcurrencyModel::Threaded).await
        }
        Commands::Worker => commands::worker::run().await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("bulkbench: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; stdout carries results and the worker protocol.
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
