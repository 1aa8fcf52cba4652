use crate::source::record::LogFormat;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

/// `Jan 2, 2006 at 3:04:05pm (UTC)`
pub const FIRST_FORMAT_LAYOUT: &str = "%b %d, %Y at %I:%M:%S%P (UTC)";

/// `2006-02-01T15:04:05Z`, day precedes month
pub const SECOND_FORMAT_LAYOUT: &str = "%Y-%d-%mT%H:%M:%SZ";

#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("empty timestamp field")]
    Empty,

    #[error("failed to parse timestamp '{value}' with layout '{layout}': {source}")]
    ParseError {
        value: String,
        layout: &'static str,
        #[source]
        source: chrono::ParseError,
    },
}

impl LogFormat {
    /// strftime layout of the timestamp field for this format
    pub fn timestamp_layout(&self) -> &'static str {
        match self {
            LogFormat::First => FIRST_FORMAT_LAYOUT,
            LogFormat::Second => SECOND_FORMAT_LAYOUT,
        }
    }

    /// Parse an already trimmed timestamp field. Both layouts are UTC.
    pub fn parse_timestamp(&self, value: &str) -> Result<DateTime<Utc>, TimestampError> {
        if value.is_empty() {
            return Err(TimestampError::Empty);
        }

        let layout = self.timestamp_layout();
        NaiveDateTime::parse_from_str(value, layout)
            .map(|ndt| Utc.from_utc_datetime(&ndt))
            .map_err(|source| TimestampError::ParseError {
                value: value.to_string(),
                layout,
                source,
            })
    }
}
