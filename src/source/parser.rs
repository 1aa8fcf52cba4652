use crate::source::record::{LogFormat, LogRecord};
use tracing::warn;

/// Separates the timestamp field from the message
pub const FIELD_DELIMITER: char = '|';

/// Parse one raw line of `source_file` into a record.
///
/// Never fails: a bad timestamp leaves the timestamp unset, and a line with no
/// delimiter becomes a message-only record. Both cases are logged.
pub fn parse_line(line: &str, source_file: &str, format: LogFormat) -> LogRecord {
    let Some((timestamp_field, message)) = line.split_once(FIELD_DELIMITER) else {
        warn!(
            source = %source_file,
            line = %line,
            "Line has no '|' delimiter, storing it as message only"
        );
        return LogRecord::new(source_file, None, line.trim(), format);
    };

    let timestamp = match format.parse_timestamp(timestamp_field.trim()) {
        Ok(ts) => Some(ts),
        Err(e) => {
            warn!(source = %source_file, error = %e, "Failed to parse timestamp");
            None
        }
    };

    LogRecord::new(source_file, timestamp, message.trim(), format)
}
