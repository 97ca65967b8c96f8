use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use bulkbench_core::{build_rows, generate, BatchJob, BenchResult, ConnectionSettings};
use bulkbench_pg::{strategy_for, ConnectionProvider, WriteOptions};

/// Executes a single batch job from scratch.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Runs the job and returns the number of rows written.
    async fn run(&self, job: &BatchJob) -> BenchResult<u64>;
}

/// Generates the batch, opens a dedicated connection, writes, releases.
#[derive(Debug, Clone)]
pub struct PgJobRunner {
    provider: ConnectionProvider,
    options: WriteOptions,
}

impl PgJobRunner {
    pub fn new(settings: Arc<ConnectionSettings>, options: WriteOptions) -> Self {
        Self {
            provider: ConnectionProvider::new(settings),
            options,
        }
    }
}

#[async_trait]
impl JobRunner for PgJobRunner {
    async fn run(&self, job: &BatchJob) -> BenchResult<u64> {
        let started = Instant::now();
        let payload = generate(job.payload_size_kb);
        let rows = build_rows(job.row_count, &payload)?;

        let mut conn = self.provider.acquire().await?;
        let strategy = strategy_for(job.strategy, self.options);
        let result = strategy.write(&mut conn, &job.table, &rows).await;
        conn.release().await;

        let written = result?;
        tracing::debug!(
            table = %job.table,
            strategy = %job.strategy,
            rows = written,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch written"
        );
        Ok(written)
    }
}
