use crate::source::record::LogRecord;
use std::fmt;
use tokio_util::sync::CancellationToken;

#[derive(Debug, PartialEq, Eq)]
pub enum SendError {
    /// The consumer is gone
    Disconnected,
    /// Shutdown began before the consumer took the record
    Cancelled,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Disconnected => write!(f, "ingestion channel disconnected"),
            SendError::Cancelled => write!(f, "send cancelled"),
        }
    }
}

impl std::error::Error for SendError {}

/// Create the ingestion channel: a zero-capacity hand-off from many tail
/// monitors to the single sink writer. A send completes only once the writer
/// has taken the record, so a slow sink throttles every producer.
pub fn ingestion_channel() -> (IngestSender, IngestReceiver) {
    let (tx, rx) = flume::bounded(0);
    (IngestSender { tx }, IngestReceiver { rx })
}

#[derive(Clone)]
pub struct IngestSender {
    tx: flume::Sender<LogRecord>,
}

impl IngestSender {
    /// Hand a record to the writer, waiting until it is taken or `cancel` fires.
    pub async fn send(&self, record: LogRecord, cancel: &CancellationToken) -> Result<(), SendError> {
        let record = match self.tx.try_send(record) {
            Ok(()) => return Ok(()),
            Err(flume::TrySendError::Disconnected(_)) => return Err(SendError::Disconnected),
            Err(flume::TrySendError::Full(record)) => record,
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SendError::Cancelled),
            result = self.tx.send_async(record) => result.map_err(|_| SendError::Disconnected),
        }
    }

    pub fn is_disconnected(&self) -> bool {
        self.tx.is_disconnected()
    }
}

pub struct IngestReceiver {
    rx: flume::Receiver<LogRecord>,
}

impl IngestReceiver {
    /// Next record from any producer; `None` once every sender is dropped
    pub async fn recv(&self) -> Option<LogRecord> {
        self.rx.recv_async().await.ok()
    }
}
