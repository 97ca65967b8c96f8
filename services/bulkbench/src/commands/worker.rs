use std::sync::Arc;

use anyhow::{Context, Result};
use bulkbench_pg::WriteOptions;
use bulkbench_runner::{serve_worker, JobRunner, PgJobRunner};
use tokio::io::BufReader;

/// Child side of `test-multiprocess`. Connection settings arrive on the
/// first stdin line, so no configuration is loaded here.
pub async fn run() -> Result<()> {
    let served = serve_worker(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        |init| {
            let options = WriteOptions {
                page_size: init.page_size,
            };
            Arc::new(PgJobRunner::new(Arc::new(init.settings), options)) as Arc<dyn JobRunner>
        },
    )
    .await
    .context("worker protocol failed")?;

    tracing::debug!(jobs = served, "worker exiting");
    Ok(())
}
