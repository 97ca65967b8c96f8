use std::sync::Arc;
use std::time::{Duration, Instant};

use bulkbench_core::{
    partition, BatchPlan, BenchError, BenchResult, ConcurrencyModel, ConnectionSettings,
};
use bulkbench_pg::WriteOptions;

use crate::executor::PgJobRunner;
use crate::pool::{JobOutcome, WorkerPool};
use crate::process::{ProcessPool, WorkerCommand};
use crate::protocol::WorkerInit;
use crate::threaded::ThreadedPool;

/// Wall-clock duration of one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingResult {
    pub elapsed: Duration,
}

impl TimingResult {
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Everything a run produced.
#[derive(Debug)]
pub struct BenchmarkReport {
    pub plan: BatchPlan,
    pub workers: usize,
    pub timing: TimingResult,
    /// Sorted by job index.
    pub outcomes: Vec<JobOutcome>,
    pub rows_dropped: u64,
}

impl BenchmarkReport {
    pub fn jobs(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failed_jobs(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_ok()).count()
    }

    pub fn rows_written(&self) -> u64 {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .sum()
    }

    pub fn throughput(&self) -> f64 {
        let secs = self.timing.elapsed_seconds();
        if secs > 0.0 {
            self.rows_written() as f64 / secs
        } else {
            0.0
        }
    }

    /// Error of the lowest-numbered failed job.
    pub fn first_error(&self) -> Option<&BenchError> {
        self.outcomes.iter().find_map(|o| o.result.as_ref().err())
    }

    /// Consumes the report, keeping only the first error.
    pub fn into_first_error(self) -> Option<BenchError> {
        self.outcomes.into_iter().find_map(|o| o.result.err())
    }
}

/// Times the dispatch of a plan through a worker pool.
pub struct BenchmarkRunner {
    pool: Arc<dyn WorkerPool>,
}

impl BenchmarkRunner {
    pub fn new(pool: Arc<dyn WorkerPool>) -> Self {
        Self { pool }
    }

    /// Partitions the plan, dispatches every job and waits for all of them.
    ///
    /// The clock covers dispatch through the last collected outcome. Job
    /// failures are kept in the report; only an invalid plan is an error.
    pub async fn measure(&self, plan: &BatchPlan) -> BenchResult<BenchmarkReport> {
        let split = partition(plan)?;

        tracing::info!(
            table = %plan.table,
            strategy = %plan.strategy,
            model = %self.pool.model(),
            workers = self.pool.worker_count(),
            jobs = split.jobs.len(),
            batch_size = plan.batch_size,
            payload_kb = plan.payload_size_kb,
            "starting benchmark"
        );

        let start = Instant::now();
        let mut outcomes = self.pool.run_all(split.jobs).await;
        let timing = TimingResult {
            elapsed: start.elapsed(),
        };

        outcomes.sort_by_key(|o| o.index);

        let report = BenchmarkReport {
            plan: plan.clone(),
            workers: self.pool.worker_count(),
            timing,
            outcomes,
            rows_dropped: split.dropped_rows,
        };

        tracing::info!(
            elapsed_ms = timing.elapsed.as_millis() as u64,
            rows = report.rows_written(),
            failed_jobs = report.failed_jobs(),
            "benchmark finished"
        );

        Ok(report)
    }
}

/// Builds the pool the plan's concurrency model asks for.
pub fn pool_for(
    plan: &BatchPlan,
    settings: Arc<ConnectionSettings>,
    options: WriteOptions,
) -> BenchResult<Arc<dyn WorkerPool>> {
    let workers = plan.resolved_workers()?;
    let pool: Arc<dyn WorkerPool> = match plan.model {
        ConcurrencyModel::Threaded => Arc::new(ThreadedPool::new(
            Arc::new(PgJobRunner::new(settings, options)),
            workers,
        )),
        ConcurrencyModel::Process => {
            let init = WorkerInit {
                settings: (*settings).clone(),
                page_size: options.page_size,
            };
            Arc::new(ProcessPool::new(WorkerCommand::current_exe()?, init, workers))
        }
    };
    Ok(pool)
}
