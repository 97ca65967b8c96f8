//! Child side of the process pool.

use std::sync::Arc;

use bulkbench_core::BenchResult;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::executor::JobRunner;
use crate::protocol::{decode_line, encode_line, JobReport, JobRequest, WorkerInit};

/// Serves jobs from `reader` until it reaches end of input.
///
/// The first line must be a [`WorkerInit`], from which `make_runner` builds
/// the runner used for every following request. Each job is run from
/// scratch and answered with one report line. Returns the number of jobs
/// served.
pub async fn serve_worker<R, W, F>(reader: R, mut writer: W, make_runner: F) -> BenchResult<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    F: FnOnce(WorkerInit) -> Arc<dyn JobRunner>,
{
    let mut lines = reader.lines();

    let Some(init_line) = lines.next_line().await? else {
        return Ok(0);
    };
    let init: WorkerInit = decode_line(&init_line)?;
    let runner = make_runner(init);

    let mut served = 0;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let request: JobRequest = decode_line(&line)?;
        let result = runner.run(&request.job).await;
        if let Err(err) = &result {
            tracing::warn!(job = request.index, error = %err, "batch job failed");
        }

        let report = JobReport::from_result(request.index, &result);
        writer.write_all(&encode_line(&report)?).await?;
        writer.flush().await?;
        served += 1;
    }

    Ok(served)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bulkbench_core::{
        BatchJob, BenchError, ConnectionSettings, StrategyKind, TableName,
    };
    use parking_lot::Mutex;

    struct EchoRunner;

    #[async_trait]
    impl JobRunner for EchoRunner {
        async fn run(&self, job: &BatchJob) -> BenchResult<u64> {
            if job.payload_size_kb == 99 {
                Err(BenchError::write("rejected"))
            } else {
                Ok(job.row_count)
            }
        }
    }

    fn init() -> WorkerInit {
        WorkerInit {
            settings: ConnectionSettings {
                host: "localhost".to_string(),
                port: 5432,
                database: "postgres".to_string(),
                username: "bench".to_string(),
                password: "pw".to_string(),
            },
            page_size: 50,
        }
    }

    fn request(index: usize, payload_size_kb: u32) -> JobRequest {
        JobRequest {
            index,
            job: BatchJob {
                table: TableName::parse("t").unwrap(),
                row_count: 25,
                payload_size_kb,
                strategy: StrategyKind::Batched,
            },
        }
    }

    fn session(messages: &[Vec<u8>]) -> Vec<u8> {
        messages.concat()
    }

    #[tokio::test]
    async fn answers_every_request_in_order() {
        let input = session(&[
            encode_line(&init()).unwrap(),
            encode_line(&request(0, 1)).unwrap(),
            encode_line(&request(1, 99)).unwrap(),
            encode_line(&request(2, 1)).unwrap(),
        ]);
        let mut output = Vec::new();
        let seen_page_size = Arc::new(Mutex::new(None));
        let seen = Arc::clone(&seen_page_size);

        let served = serve_worker(input.as_slice(), &mut output, move |init| {
            *seen.lock() = Some(init.page_size);
            Arc::new(EchoRunner) as Arc<dyn JobRunner>
        })
        .await
        .unwrap();

        assert_eq!(served, 3);
        assert_eq!(*seen_page_size.lock(), Some(50));

        let reports: Vec<JobReport> = std::str::from_utf8(&output)
            .unwrap()
            .lines()
            .map(|line| decode_line(line).unwrap())
            .collect();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0], JobReport::from_result(0, &Ok(25)));
        assert!(reports[1].failure.is_some());
        assert_eq!(reports[2].rows_written, 25);
    }

    #[tokio::test]
    async fn empty_input_serves_nothing() {
        let mut output = Vec::new();
        let served = serve_worker(&b""[..], &mut output, |_| {
            Arc::new(EchoRunner) as Arc<dyn JobRunner>
        })
        .await
        .unwrap();
        assert_eq!(served, 0);
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn malformed_request_stops_the_worker() {
        let input = session(&[encode_line(&init()).unwrap(), b"{oops\n".to_vec()]);
        let mut output = Vec::new();
        let result = serve_worker(input.as_slice(), &mut output, |_| {
            Arc::new(EchoRunner) as Arc<dyn JobRunner>
        })
        .await;
        assert!(matches!(result, Err(BenchError::Worker { .. })));
    }
}
