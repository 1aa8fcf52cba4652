pub mod duckdb;
pub mod supervisor;
pub mod traits;

pub use duckdb::{DuckDbSink, StoredRecord};
pub use supervisor::{run_health_checks, HealthStatus, SupervisedSink};
pub use traits::{Sink, SinkError};
