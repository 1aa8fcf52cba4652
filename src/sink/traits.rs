use crate::source::record::LogRecord;
use async_trait::async_trait;

/// Persistent destination for log records.
///
/// Implementations must tolerate concurrent calls; reconnects are serialized
/// by the caller.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Persist a single record
    async fn insert(&self, record: &LogRecord) -> Result<(), SinkError>;

    /// Check that the backend is reachable
    async fn ping(&self) -> Result<(), SinkError>;

    /// Drop the current connection and establish a fresh one
    async fn reconnect(&self) -> Result<(), SinkError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("sink is not connected")]
    Disconnected,

    #[error("sink task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("sink error: {0}")]
    Generic(String),
}
