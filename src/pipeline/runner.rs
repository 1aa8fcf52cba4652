use crate::pipeline::channel::IngestReceiver;
use crate::sink::SupervisedSink;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Counters reported when the writer stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub persisted: u64,
    pub failed: u64,
}

/// Run the sink writer task.
///
/// Drains the ingestion channel one record at a time and persists each one
/// before taking the next, so all sink access is serialized. A failed insert
/// is logged and the record dropped. Stops when cancelled or when every
/// producer has gone away; an insert already in progress is allowed to finish.
pub async fn run_sink_writer(
    input: IngestReceiver,
    sink: Arc<SupervisedSink>,
    cancel: CancellationToken,
) -> WriterStats {
    let mut stats = WriterStats::default();

    info!("Sink writer started");

    loop {
        let record = tokio::select! {
            _ = cancel.cancelled() => break,
            record = input.recv() => match record {
                Some(record) => record,
                None => {
                    info!("All producers stopped, ingestion channel closed");
                    break;
                }
            },
        };

        match sink.insert(&record).await {
            Ok(()) => {
                stats.persisted += 1;
                debug!(source = %record.source_file(), "Persisted record");
            }
            Err(e) => {
                stats.failed += 1;
                error!(source = %record.source_file(), error = %e, "Failed to save record to sink");
            }
        }
    }

    info!(
        persisted = stats.persisted,
        failed = stats.failed,
        "Sink writer shutdown complete"
    );

    stats
}
