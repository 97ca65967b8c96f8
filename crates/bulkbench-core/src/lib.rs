//! Core domain types for the bulkbench write-throughput harness.

pub mod config;
pub mod credentials;
pub mod error;
pub mod job;
pub mod payload;
pub mod table;

pub use config::{
    BenchConfig, BenchmarkDefaults, CredentialSource, CredentialsConfig, DatabaseConfig,
    MAX_PAGE_SIZE,
};
pub use credentials::{ConnectionSettings, Credentials};
pub use error::{BenchError, BenchResult, FailureKind, JobFailure};
pub use job::{partition, BatchJob, BatchPlan, ConcurrencyModel, Partition, StrategyKind};
pub use payload::{build_rows, generate, Payload, SyntheticRow};
pub use table::TableName;
