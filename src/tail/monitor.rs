use crate::pipeline::channel::{IngestSender, SendError};
use crate::source::format::detect_format;
use crate::source::parser::parse_line;
use crate::source::reader::{read_new_lines, SkipCounter};
use crate::source::record::LogFormat;
use crate::source::WatchedFile;
use crate::tail::feed::{ChangeFeed, ChangeNotice};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Why a monitor stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorExit {
    Cancelled,
    FeedClosed,
    ChannelClosed,
}

/// Tails one file for the life of the process.
///
/// Cycles WATCHING -> DEBOUNCING -> READING: waits for a write notice, sleeps
/// for the debounce delay, then reads every line appended since the last read
/// and pushes the parsed records into the ingestion channel.
pub struct TailMonitor {
    path: PathBuf,
    source_file: String,
    format: LogFormat,
    skip: SkipCounter,
    debounce: Duration,
}

impl TailMonitor {
    pub fn new(
        path: PathBuf,
        source_file: String,
        format: LogFormat,
        skip: SkipCounter,
        debounce: Duration,
    ) -> Self {
        Self {
            path,
            source_file,
            format,
            skip,
            debounce,
        }
    }

    /// Classify the file and seed its skip counter so only lines appended from
    /// now on are ingested. `None` if the format cannot be determined or the
    /// existing lines cannot be counted; such a file is not tailed.
    ///
    /// Subscribe to the file's changes before calling this, so nothing appended
    /// after the count goes unnoticed.
    pub fn start(file: &WatchedFile, debounce: Duration) -> Option<Self> {
        let format = detect_format(&file.path)?;
        Self::seeded(file, format, debounce)
    }

    fn seeded(file: &WatchedFile, format: LogFormat, debounce: Duration) -> Option<Self> {
        let skip = match SkipCounter::seed(&file.path) {
            Ok(skip) => skip,
            Err(e) => {
                error!(source = %file.source_file, error = %e, "Failed to count existing lines");
                return None;
            }
        };

        info!(
            source = %file.source_file,
            format = %format,
            existing_lines = skip.consumed(),
            "Tail monitor ready"
        );

        Some(Self::new(
            file.path.clone(),
            file.source_file.clone(),
            format,
            skip,
            debounce,
        ))
    }

    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    pub fn consumed(&self) -> usize {
        self.skip.consumed()
    }

    /// Run until cancelled or until the feed or the channel closes. The feed is
    /// dropped on return, which releases the file subscription.
    pub async fn run<F: ChangeFeed>(
        mut self,
        mut feed: F,
        output: IngestSender,
        cancel: CancellationToken,
    ) -> MonitorExit {
        let exit = loop {
            // WATCHING
            let notice = tokio::select! {
                _ = cancel.cancelled() => break MonitorExit::Cancelled,
                notice = feed.next() => notice,
            };

            match notice {
                Some(ChangeNotice::Write) => {}
                Some(ChangeNotice::Other) => continue,
                Some(ChangeNotice::Error(e)) => {
                    warn!(source = %self.source_file, error = %e, "Change notification error");
                    continue;
                }
                None => break MonitorExit::FeedClosed,
            }

            // DEBOUNCING
            if !self.debounce.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => break MonitorExit::Cancelled,
                    _ = tokio::time::sleep(self.debounce) => {}
                }
            }
            // The read below covers anything that arrived during the delay
            while let Some(notice) = feed.try_next() {
                if let ChangeNotice::Error(e) = notice {
                    warn!(source = %self.source_file, error = %e, "Change notification error");
                }
            }

            // READING
            if let Some(exit) = self.forward_new_lines(&output, &cancel).await {
                break exit;
            }
        };

        info!(source = %self.source_file, reason = ?exit, consumed = self.skip.consumed(), "Tail monitor stopped");
        exit
    }

    async fn forward_new_lines(
        &mut self,
        output: &IngestSender,
        cancel: &CancellationToken,
    ) -> Option<MonitorExit> {
        let lines = match read_new_lines(&self.path, &mut self.skip) {
            Ok(lines) => lines,
            Err(e) => {
                warn!(source = %self.source_file, error = %e, "Failed to read new lines");
                return None;
            }
        };

        if !lines.is_empty() {
            debug!(source = %self.source_file, count = lines.len(), "Read new lines");
        }

        // Lines already read stay in memory until the writer accepts them
        for line in lines {
            let record = parse_line(&line, &self.source_file, self.format);
            match output.send(record, cancel).await {
                Ok(()) => {}
                Err(SendError::Cancelled) => return Some(MonitorExit::Cancelled),
                Err(SendError::Disconnected) => {
                    warn!(source = %self.source_file, "Ingestion channel closed");
                    return Some(MonitorExit::ChannelClosed);
                }
            }
        }

        None
    }
}
