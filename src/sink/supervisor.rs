use super::traits::{Sink, SinkError};
use crate::source::record::LogRecord;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Outcome of a health check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Ping succeeded
    Healthy,
    /// Ping failed, reconnect and re-ping succeeded
    Recovered,
    /// Still unreachable after trying to reconnect
    Unreachable,
}

/// Sole owner of the sink connection.
///
/// Health checks (timer-driven and before every insert) are serialized by a
/// single lock, so two callers never reconnect at the same time.
pub struct SupervisedSink {
    sink: Arc<dyn Sink>,
    check_lock: Mutex<()>,
}

impl SupervisedSink {
    pub fn new(sink: Arc<dyn Sink>) -> Self {
        Self {
            sink,
            check_lock: Mutex::new(()),
        }
    }

    /// Ping the sink and try to reconnect if it is unreachable. Never fails;
    /// problems are logged and reported through the returned status.
    pub async fn ensure_healthy(&self) -> HealthStatus {
        let _guard = self.check_lock.lock().await;

        let Err(e) = self.sink.ping().await else {
            return HealthStatus::Healthy;
        };
        warn!(error = %e, "Lost connection to sink");

        if let Err(e) = self.sink.reconnect().await {
            error!(error = %e, "Failed to reconnect to sink");
            return HealthStatus::Unreachable;
        }

        match self.sink.ping().await {
            Ok(()) => {
                info!("Reconnect to sink successful");
                HealthStatus::Recovered
            }
            Err(e) => {
                error!(error = %e, "Sink still unreachable after reconnect");
                HealthStatus::Unreachable
            }
        }
    }

    /// Check connection health, then persist the record
    pub async fn insert(&self, record: &LogRecord) -> Result<(), SinkError> {
        self.ensure_healthy().await;
        self.sink.insert(record).await
    }
}

/// Run `ensure_healthy` every `period` until cancelled. There is no backoff
/// and no retry limit.
pub async fn run_health_checks(sink: Arc<SupervisedSink>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(period = ?period, "Sink health checker started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let status = sink.ensure_healthy().await;
                debug!(status = ?status, "Sink health check");
            }
        }
    }

    info!("Sink health checker stopped");
}
