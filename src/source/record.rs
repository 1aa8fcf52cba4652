use chrono::{DateTime, Utc};
use std::fmt;

/// Line layout of a tailed file, fixed per file at monitor startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogFormat {
    /// Human-readable timestamps, e.g. `Jan 2, 2006 at 3:04:05pm (UTC)`.
    First,
    /// Compact timestamps with day before month, e.g. `2006-02-01T15:04:05Z`.
    Second,
}

impl LogFormat {
    /// Tag persisted alongside every record
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::First => "first_format",
            LogFormat::Second => "second_format",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed log line on its way to the sink.
///
/// Records are immutable once built and hold no reference to the file or
/// watcher that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    source_file: String,
    timestamp: Option<DateTime<Utc>>,
    message: String,
    format: LogFormat,
}

impl LogRecord {
    pub fn new(
        source_file: impl Into<String>,
        timestamp: Option<DateTime<Utc>>,
        message: impl Into<String>,
        format: LogFormat,
    ) -> Self {
        Self {
            source_file: source_file.into(),
            timestamp,
            message: message.into(),
            format,
        }
    }

    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    /// `None` when the line carried no parseable timestamp
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }
}
