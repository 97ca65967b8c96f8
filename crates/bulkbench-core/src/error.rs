use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical error type for benchmark operations.
#[derive(Debug, Error)]
pub enum BenchError {
    /// Connection parameters, secrets or run parameters are missing or invalid.
    #[error("configuration error: {message}")]
    Configuration {
        /// Human-readable description of the invalid setting.
        message: String,
    },

    /// The datastore was unreachable or rejected the credentials.
    #[error("connection error: {message}")]
    Connection {
        /// Message reported by the driver.
        message: String,
    },

    /// A batch insert failed, either through statements or the bulk stream.
    #[error("write error: {message}")]
    Write {
        /// Message reported by the driver or the encoder.
        message: String,
    },

    /// The remote secret store rejected or failed the lookup.
    #[error("secret service error: {message}")]
    SecretService {
        /// Message reported by the secret service, unchanged.
        message: String,
    },

    /// A worker process or task died or broke the job protocol.
    #[error("worker error: {message}")]
    Worker {
        /// Details about the failed worker.
        message: String,
    },

    /// I/O error while talking to a worker process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BenchError {
    /// Creates a `Configuration` variant.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a `Connection` variant.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a `Write` variant.
    #[must_use]
    pub fn write(message: impl Into<String>) -> Self {
        Self::Write {
            message: message.into(),
        }
    }

    /// Creates a `SecretService` variant.
    #[must_use]
    pub fn secret_service(message: impl Into<String>) -> Self {
        Self::SecretService {
            message: message.into(),
        }
    }

    /// Creates a `Worker` variant.
    #[must_use]
    pub fn worker(message: impl Into<String>) -> Self {
        Self::Worker {
            message: message.into(),
        }
    }

    /// Returns the wire-level classification of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Configuration { .. } => FailureKind::Configuration,
            Self::Connection { .. } => FailureKind::Connection,
            Self::Write { .. } => FailureKind::Write,
            Self::SecretService { .. } => FailureKind::SecretService,
            Self::Worker { .. } | Self::Io(_) => FailureKind::Worker,
        }
    }

    /// Flattens the error into a form that can cross a process boundary.
    pub fn to_failure(&self) -> JobFailure {
        let message = match self {
            Self::Configuration { message }
            | Self::Connection { message }
            | Self::Write { message }
            | Self::SecretService { message }
            | Self::Worker { message } => message.clone(),
            Self::Io(err) => err.to_string(),
        };
        JobFailure {
            kind: self.kind(),
            message,
        }
    }
}

impl From<config::ConfigError> for BenchError {
    fn from(err: config::ConfigError) -> Self {
        Self::configuration(err.to_string())
    }
}

/// Error classification shared between the dispatcher and worker processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Configuration,
    Connection,
    Write,
    SecretService,
    Worker,
}

/// Serializable job failure reported by a worker process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<JobFailure> for BenchError {
    fn from(failure: JobFailure) -> Self {
        let JobFailure { kind, message } = failure;
        match kind {
            FailureKind::Configuration => Self::Configuration { message },
            FailureKind::Connection => Self::Connection { message },
            FailureKind::Write => Self::Write { message },
            FailureKind::SecretService => Self::SecretService { message },
            FailureKind::Worker => Self::Worker { message },
        }
    }
}

/// Convenient result alias for benchmark operations.
pub type BenchResult<T> = Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_round_trips_through_json() {
        let err = BenchError::connection("connection refused");
        let wire = serde_json::to_string(&err.to_failure()).unwrap();
        let restored: JobFailure = serde_json::from_str(&wire).unwrap();

        let err = BenchError::from(restored);
        assert!(matches!(err, BenchError::Connection { ref message } if message == "connection refused"));
    }

    #[test]
    fn io_errors_are_worker_failures() {
        let err = BenchError::from(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "pipe closed",
        ));
        let failure = err.to_failure();
        assert_eq!(failure.kind, FailureKind::Worker);
        assert_eq!(failure.message, "pipe closed");
    }

    #[test]
    fn display_includes_category() {
        assert_eq!(
            BenchError::write("duplicate key").to_string(),
            "write error: duplicate key"
        );
    }
}
