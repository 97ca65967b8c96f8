use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, BenchResult};
use crate::table::TableName;

/// Default pool size for the threaded model.
pub const DEFAULT_THREADED_WORKERS: usize = 4;

/// Method used to write a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Grouped parameterized `INSERT` statements in one transaction.
    #[serde(alias = "batch")]
    Batched,
    /// Single `COPY ... FROM STDIN` text stream.
    #[serde(alias = "copy")]
    Bulk,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Batched => "batched",
            Self::Bulk => "bulk",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "batched" | "batch" => Ok(Self::Batched),
            "bulk" | "copy" => Ok(Self::Bulk),
            other => Err(BenchError::configuration(format!(
                "unknown strategy `{other}`, expected `batched` or `bulk`"
            ))),
        }
    }
}

/// Execution model for the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrencyModel {
    /// One child process per worker, nothing shared but the job stream.
    Process,
    /// Tasks on the current runtime, bounded by a semaphore.
    Threaded,
}

impl ConcurrencyModel {
    /// Worker count used when the operator does not pass one.
    pub fn default_workers(&self) -> usize {
        match self {
            Self::Process => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            Self::Threaded => DEFAULT_THREADED_WORKERS,
        }
    }
}

impl fmt::Display for ConcurrencyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Process => f.write_str("process"),
            Self::Threaded => f.write_str("threaded"),
        }
    }
}

/// One unit of dispatched insert work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchJob {
    pub table: TableName,
    pub row_count: u64,
    pub payload_size_kb: u32,
    pub strategy: StrategyKind,
}

/// Parameters of one benchmark run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    pub table: TableName,
    pub total_rows: u64,
    pub batch_size: u64,
    pub payload_size_kb: u32,
    pub strategy: StrategyKind,
    /// `None` selects the model's default.
    pub worker_count: Option<usize>,
    pub model: ConcurrencyModel,
}

impl BatchPlan {
    /// Number of workers the pool should be sized to.
    pub fn resolved_workers(&self) -> BenchResult<usize> {
        match self.worker_count {
            Some(0) => Err(BenchError::configuration("worker count must be > 0")),
            Some(n) => Ok(n),
            None => Ok(self.model.default_workers()),
        }
    }
}

/// Result of splitting a run into batch jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub jobs: Vec<BatchJob>,
    /// `total_rows % batch_size`; these rows are never written.
    pub dropped_rows: u64,
}

impl Partition {
    /// Rows the jobs will write if every one of them succeeds.
    pub fn scheduled_rows(&self) -> u64 {
        self.jobs.iter().map(|job| job.row_count).sum()
    }
}

/// Splits `plan.total_rows` into `total_rows / batch_size` full batches.
///
/// The remainder is dropped rather than sent as a short final batch.
pub fn partition(plan: &BatchPlan) -> BenchResult<Partition> {
    if plan.batch_size == 0 {
        return Err(BenchError::configuration("batch size must be > 0"));
    }

    let task_count = plan.total_rows / plan.batch_size;
    let dropped_rows = plan.total_rows % plan.batch_size;
    let task_count = usize::try_from(task_count)
        .map_err(|_| BenchError::configuration("too many batches for this platform"))?;

    let job = BatchJob {
        table: plan.table.clone(),
        row_count: plan.batch_size,
        payload_size_kb: plan.payload_size_kb,
        strategy: plan.strategy,
    };

    if dropped_rows > 0 {
        tracing::warn!(
            dropped_rows,
            batch_size = plan.batch_size,
            "row count is not a multiple of the batch size; remainder will not be written"
        );
    }

    Ok(Partition {
        jobs: vec![job; task_count],
        dropped_rows,
    })
}
