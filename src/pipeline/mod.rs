pub mod channel;
pub mod runner;

pub use channel::{ingestion_channel, IngestReceiver, IngestSender, SendError};
pub use runner::{run_sink_writer, WriterStats};
