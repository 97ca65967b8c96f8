//! Shared-memory worker pool on the tokio runtime.

use std::sync::Arc;

use async_trait::async_trait;
use bulkbench_core::{BatchJob, BenchError, ConcurrencyModel};
use tokio::sync::Semaphore;

use crate::executor::JobRunner;
use crate::pool::{JobOutcome, WorkerPool};

/// Runs jobs as tasks in this process, at most `workers` at a time.
///
/// Jobs share the process but not connections: each one opens its own
/// through the runner.
pub struct ThreadedPool {
    runner: Arc<dyn JobRunner>,
    workers: usize,
}

impl ThreadedPool {
    pub fn new(runner: Arc<dyn JobRunner>, workers: usize) -> Self {
        Self {
            runner,
            workers: workers.max(1),
        }
    }
}

#[async_trait]
impl WorkerPool for ThreadedPool {
    fn model(&self) -> ConcurrencyModel {
        ConcurrencyModel::Threaded
    }

    fn worker_count(&self) -> usize {
        self.workers
    }

    async fn run_all(&self, jobs: Vec<BatchJob>) -> Vec<JobOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles = Vec::with_capacity(jobs.len());

        for (index, job) in jobs.into_iter().enumerate() {
            let runner = Arc::clone(&self.runner);
            let semaphore = Arc::clone(&semaphore);

            let handle = tokio::spawn(async move {
                match semaphore.acquire_owned().await {
                    Ok(_permit) => runner.run(&job).await,
                    Err(_) => Err(BenchError::worker("worker pool closed")),
                }
            });
            handles.push((index, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (index, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(err) => Err(BenchError::worker(format!("job task failed: {err}"))),
            };
            if let Err(err) = &result {
                tracing::warn!(job = index, error = %err, "batch job failed");
            }
            outcomes.push(JobOutcome { index, result });
        }

        outcomes
    }
}
