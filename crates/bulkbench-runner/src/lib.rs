//! Worker pools and the benchmark runner.
//!
//! A run is split into batch jobs, handed to a [`WorkerPool`] and timed by the
//! [`BenchmarkRunner`]. Pools collect every outcome; a failed job never stops
//! its siblings.

pub mod executor;
pub mod pool;
pub mod process;
pub mod protocol;
pub mod runner;
pub mod threaded;
pub mod worker;

pub use executor::{JobRunner, PgJobRunner};
pub use pool::{JobOutcome, WorkerPool};
pub use process::{ProcessPool, WorkerCommand};
pub use protocol::{JobReport, JobRequest, WorkerInit};
pub use runner::{pool_for, BenchmarkReport, BenchmarkRunner, TimingResult};
pub use threaded::ThreadedPool;
pub use worker::serve_worker;
