use async_trait::async_trait;
use bulkbench_core::{BatchJob, BenchResult, ConcurrencyModel};

/// Outcome of one dispatched job.
#[derive(Debug)]
pub struct JobOutcome {
    /// Position of the job in the dispatched list.
    pub index: usize,
    /// Rows written, or the job's error.
    pub result: BenchResult<u64>,
}

impl JobOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Submit-all, await-all execution of batch jobs.
///
/// Implementations run every job to completion regardless of sibling
/// failures and return exactly one outcome per job, in no particular order.
#[async_trait]
pub trait WorkerPool: Send + Sync {
    fn model(&self) -> ConcurrencyModel;

    fn worker_count(&self) -> usize;

    async fn run_all(&self, jobs: Vec<BatchJob>) -> Vec<JobOutcome>;
}
