//! Line-delimited JSON messages between the dispatcher and worker processes.
//!
//! The parent writes one [`WorkerInit`] line, then one [`JobRequest`] line per
//! job; the worker answers every request with exactly one [`JobReport`] line.
//! Closing the worker's stdin ends the session.

use bulkbench_core::{BatchJob, BenchError, BenchResult, ConnectionSettings, JobFailure};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::pool::JobOutcome;

/// First message of a session: everything the worker may not read from the
/// environment on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerInit {
    pub settings: ConnectionSettings,
    pub page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    pub index: usize,
    pub job: BatchJob,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    pub index: usize,
    #[serde(default)]
    pub rows_written: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<JobFailure>,
}

impl JobReport {
    pub fn from_result(index: usize, result: &BenchResult<u64>) -> Self {
        match result {
            Ok(rows_written) => Self {
                index,
                rows_written: *rows_written,
                failure: None,
            },
            Err(err) => Self {
                index,
                rows_written: 0,
                failure: Some(err.to_failure()),
            },
        }
    }
}

impl From<JobReport> for JobOutcome {
    fn from(report: JobReport) -> Self {
        let result = match report.failure {
            None => Ok(report.rows_written),
            Some(failure) => Err(BenchError::from(failure)),
        };
        JobOutcome {
            index: report.index,
            result,
        }
    }
}

/// Serializes a message as a single newline-terminated line.
pub fn encode_line<T: Serialize>(message: &T) -> BenchResult<Vec<u8>> {
    let mut line = serde_json::to_vec(message)
        .map_err(|err| BenchError::worker(format!("failed to encode message: {err}")))?;
    line.push(b'\n');
    Ok(line)
}

/// Parses one line read from the peer.
pub fn decode_line<T: DeserializeOwned>(line: &str) -> BenchResult<T> {
    serde_json::from_str(line.trim_end())
        .map_err(|err| BenchError::worker(format!("malformed message from peer: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulkbench_core::FailureKind;

    #[test]
    fn successful_report_becomes_ok_outcome() {
        let report = JobReport::from_result(3, &Ok(500));
        let line = encode_line(&report).unwrap();
        assert_eq!(line.last(), Some(&b'\n'));

        let parsed: JobReport = decode_line(std::str::from_utf8(&line).unwrap()).unwrap();
        let outcome = JobOutcome::from(parsed);
        assert_eq!(outcome.index, 3);
        assert_eq!(outcome.result.unwrap(), 500);
    }

    #[test]
    fn failed_report_keeps_error_kind() {
        let report = JobReport::from_result(1, &Err(BenchError::write("duplicate key")));
        assert_eq!(report.failure.as_ref().unwrap().kind, FailureKind::Write);

        let outcome = JobOutcome::from(report);
        assert!(matches!(outcome.result, Err(BenchError::Write { .. })));
    }

    #[test]
    fn garbage_is_a_worker_error() {
        let err = decode_line::<JobReport>("not json\n").unwrap_err();
        assert!(matches!(err, BenchError::Worker { .. }));
    }
}
