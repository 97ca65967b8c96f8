use std::path::Path;

use anyhow::{bail, Context, Result};
use bulkbench_core::{BatchPlan, ConcurrencyModel, MAX_PAGE_SIZE};
use bulkbench_pg::WriteOptions;
use bulkbench_runner::{pool_for, BenchmarkReport, BenchmarkRunner};

use super::{connection_settings, load_config, table_name};
use crate::BenchArgs;

/// Runs one timed benchmark and prints its report.
///
/// The report is printed even when jobs failed; the first failure then
/// becomes the command's error.
pub async fn run(
    config_path: Option<&Path>,
    args: BenchArgs,
    model: ConcurrencyModel,
) -> Result<()> {
    let config = load_config(config_path)?;
    let defaults = &config.benchmark;

    let table = table_name(args.table, &config)?;
    let worker_count = match model {
        ConcurrencyModel::Threaded => Some(args.nworkers.unwrap_or(defaults.threaded_workers)),
        ConcurrencyModel::Process => args.nworkers,
    };
    let plan = BatchPlan {
        table,
        total_rows: args.nrows.unwrap_or(defaults.total_rows),
        batch_size: args.batch_size.unwrap_or(defaults.batch_size),
        payload_size_kb: args.json_kbs.unwrap_or(defaults.payload_kb),
        strategy: args.method.unwrap_or(defaults.strategy),
        worker_count,
        model,
    };
    let page_size = args.page_size.unwrap_or(defaults.page_size);

    // Reject bad plans before any credentials are fetched.
    if plan.batch_size == 0 {
        bail!("batch size must be greater than zero");
    }
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        bail!("page size must be between 1 and {MAX_PAGE_SIZE}");
    }
    plan.resolved_workers().context("invalid benchmark plan")?;

    let settings = connection_settings(&config).await?;
    let pool = pool_for(&plan, settings, WriteOptions { page_size })
        .context("failed to build worker pool")?;
    let report = BenchmarkRunner::new(pool)
        .measure(&plan)
        .await
        .context("invalid benchmark plan")?;

    print_report(&report);

    match report.into_first_error() {
        Some(err) => Err(anyhow::Error::new(err).context("benchmark had failed jobs")),
        None => Ok(()),
    }
}

fn print_report(report: &BenchmarkReport) {
    println!("inserts {:.3} seconds", report.timing.elapsed_seconds());
    println!(
        "{} rows written by {} {} workers ({} jobs, {} failed)",
        report.rows_written(),
        report.workers,
        report.plan.model,
        report.jobs(),
        report.failed_jobs()
    );
    if report.rows_dropped > 0 {
        println!(
            "{} rows dropped (not a multiple of batch size {})",
            report.rows_dropped, report.plan.batch_size
        );
    }
    println!("{:.1} rows/s", report.throughput());
}
