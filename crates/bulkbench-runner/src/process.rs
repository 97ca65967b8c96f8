//! Process-isolated worker pool.
//!
//! Each worker is a child process running `bulkbench worker`. Workers pull
//! jobs from a shared queue one at a time, so a slow or dead child never
//! holds more than its in-flight job.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use bulkbench_core::{BatchJob, BenchError, BenchResult, ConcurrencyModel};
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{ChildStdin, ChildStdout, Command};

use crate::pool::{JobOutcome, WorkerPool};
use crate::protocol::{decode_line, encode_line, JobReport, JobRequest, WorkerInit};

type JobQueue = Arc<Mutex<VecDeque<(usize, BatchJob)>>>;

/// Program and arguments that start one worker process.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Re-runs the current executable with the `worker` subcommand.
    pub fn current_exe() -> BenchResult<Self> {
        let program = std::env::current_exe()?;
        Ok(Self::new(program, vec!["worker".to_string()]))
    }
}

/// Runs jobs in `workers` child processes.
pub struct ProcessPool {
    command: WorkerCommand,
    init: WorkerInit,
    workers: usize,
}

impl ProcessPool {
    pub fn new(command: WorkerCommand, init: WorkerInit, workers: usize) -> Self {
        Self {
            command,
            init,
            workers: workers.max(1),
        }
    }
}

#[async_trait]
impl WorkerPool for ProcessPool {
    fn model(&self) -> ConcurrencyModel {
        ConcurrencyModel::Process
    }

    fn worker_count(&self) -> usize {
        self.workers
    }

    async fn run_all(&self, jobs: Vec<BatchJob>) -> Vec<JobOutcome> {
        let total = jobs.len();
        let queue: JobQueue = Arc::new(Mutex::new(jobs.into_iter().enumerate().collect()));
        let mut outcomes = Vec::with_capacity(total);

        match encode_line(&self.init) {
            Ok(init_line) => {
                let init_line = Arc::new(init_line);
                let mut handles = Vec::new();
                for worker_id in 0..self.workers.min(total) {
                    handles.push(tokio::spawn(drive_worker(
                        worker_id,
                        self.command.clone(),
                        Arc::clone(&init_line),
                        Arc::clone(&queue),
                    )));
                }

                for handle in handles {
                    match handle.await {
                        Ok(worker_outcomes) => outcomes.extend(worker_outcomes),
                        Err(err) => tracing::error!(error = %err, "worker driver task failed"),
                    }
                }
            }
            Err(err) => tracing::error!(error = %err, "failed to encode worker init"),
        }

        // Jobs no worker could take (spawn failures, every child died) still
        // get an outcome.
        let mut reported = vec![false; total];
        for outcome in &outcomes {
            if let Some(slot) = reported.get_mut(outcome.index) {
                *slot = true;
            }
        }
        for (index, _) in reported.iter().enumerate().filter(|(_, done)| !**done) {
            outcomes.push(JobOutcome {
                index,
                result: Err(BenchError::worker("no worker process completed this job")),
            });
        }

        outcomes
    }
}

/// Owns one child process for the duration of a run.
async fn drive_worker(
    worker_id: usize,
    command: WorkerCommand,
    init_line: Arc<Vec<u8>>,
    queue: JobQueue,
) -> Vec<JobOutcome> {
    let mut outcomes = Vec::new();

    let mut child = match Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(err) => {
            tracing::error!(
                worker = worker_id,
                program = %command.program.display(),
                error = %err,
                "failed to start worker process"
            );
            return outcomes;
        }
    };

    let (Some(mut stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
        tracing::error!(worker = worker_id, "worker process has no stdio pipes");
        return outcomes;
    };
    let mut lines = BufReader::new(stdout).lines();

    let mut healthy = match stdin.write_all(&init_line).await {
        Ok(()) => true,
        Err(err) => {
            tracing::error!(worker = worker_id, error = %err, "failed to initialise worker");
            false
        }
    };

    while healthy {
        let next = queue.lock().pop_front();
        let Some((index, job)) = next else {
            break;
        };

        let result = exchange(&mut stdin, &mut lines, index, job).await;
        if let Err(err) = &result {
            tracing::error!(worker = worker_id, job = index, error = %err, "worker process lost");
            healthy = false;
        }
        outcomes.push(match result {
            Ok(report) => JobOutcome::from(report),
            Err(err) => JobOutcome {
                index,
                result: Err(err),
            },
        });
    }

    drop(stdin);
    if !healthy {
        if let Err(err) = child.start_kill() {
            tracing::debug!(worker = worker_id, error = %err, "worker already exited");
        }
    }
    match child.wait().await {
        Ok(status) if healthy && !status.success() => {
            tracing::warn!(worker = worker_id, %status, "worker process exited with failure");
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(worker = worker_id, error = %err, "failed to reap worker"),
    }

    tracing::debug!(worker = worker_id, jobs = outcomes.len(), "worker finished");
    outcomes
}

/// Sends one job and waits for its report.
async fn exchange(
    stdin: &mut ChildStdin,
    lines: &mut Lines<BufReader<ChildStdout>>,
    index: usize,
    job: BatchJob,
) -> BenchResult<JobReport> {
    let request = encode_line(&JobRequest { index, job })?;
    stdin.write_all(&request).await?;
    stdin.flush().await?;

    let line = lines
        .next_line()
        .await?
        .ok_or_else(|| BenchError::worker("worker process exited before reporting"))?;
    let report: JobReport = decode_line(&line)?;

    if report.index != index {
        return Err(BenchError::worker(format!(
            "worker reported job {} while job {index} was in flight",
            report.index
        )));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulkbench_core::{ConnectionSettings, StrategyKind, TableName};

    fn init() -> WorkerInit {
        WorkerInit {
            settings: ConnectionSettings {
                host: "127.0.0.1".to_string(),
                port: 1,
                database: "postgres".to_string(),
                username: "bench".to_string(),
                password: String::new(),
            },
            page_size: 100,
        }
    }

    fn jobs(count: usize) -> Vec<BatchJob> {
        vec![
            BatchJob {
                table: TableName::parse("t").unwrap(),
                row_count: 10,
                payload_size_kb: 1,
                strategy: StrategyKind::Batched,
            };
            count
        ]
    }

    #[tokio::test]
    async fn missing_worker_binary_fails_every_job() {
        let pool = ProcessPool::new(
            WorkerCommand::new("/nonexistent/bulkbench-worker", vec![]),
            init(),
            3,
        );

        let outcomes = pool.run_all(jobs(5)).await;

        assert_eq!(outcomes.len(), 5);
        assert!(outcomes
            .iter()
            .all(|o| matches!(o.result, Err(BenchError::Worker { .. }))));
        let mut indices: Vec<usize> = outcomes.iter().map(|o| o.index).collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn worker_that_exits_immediately_fails_its_jobs() {
        let pool = ProcessPool::new(
            WorkerCommand::new("sh", vec!["-c".to_string(), "exit 3".to_string()]),
            init(),
            2,
        );

        let outcomes = pool.run_all(jobs(4)).await;

        assert_eq!(outcomes.len(), 4);
        assert!(outcomes.iter().all(|o| !o.is_ok()));
    }

    /// Whichever child creates the lock directory first exits after reading
    /// one request; the other answers every request slowly enough that the
    /// dying child is sure to take a job.
    #[cfg(unix)]
    const ONE_CHILD_DIES: &str = r#"
read init
if mkdir "$1" 2>/dev/null; then
    read request
    exit 1
fi
while read request; do
    index=$(echo "$request" | sed 's/.*"index":\([0-9]*\).*/\1/')
    sleep 0.1
    echo "{\"index\":$index,\"rows_written\":10}"
done
"#;

    #[cfg(unix)]
    #[tokio::test]
    async fn dead_child_fails_only_its_in_flight_job() {
        let dir = tempfile::tempdir().unwrap();
        let lock = dir.path().join("dying-worker");
        let pool = ProcessPool::new(
            WorkerCommand::new(
                "sh",
                vec![
                    "-c".to_string(),
                    ONE_CHILD_DIES.to_string(),
                    "sh".to_string(),
                    lock.display().to_string(),
                ],
            ),
            init(),
            2,
        );

        let outcomes = pool.run_all(jobs(6)).await;

        assert_eq!(outcomes.len(), 6);
        let failed: Vec<&JobOutcome> = outcomes.iter().filter(|o| !o.is_ok()).collect();
        assert_eq!(failed.len(), 1);
        assert!(matches!(failed[0].result, Err(BenchError::Worker { .. })));
        let written: u64 = outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .sum();
        assert_eq!(written, 50);

        let mut indices: Vec<usize> = outcomes.iter().map(|o| o.index).collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..6).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn no_jobs_spawns_nothing() {
        let pool = ProcessPool::new(
            WorkerCommand::new("/nonexistent/bulkbench-worker", vec![]),
            init(),
            3,
        );
        assert!(pool.run_all(Vec::new()).await.is_empty());
    }
}
