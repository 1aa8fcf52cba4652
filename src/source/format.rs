use crate::source::record::LogFormat;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, error};

/// Classify a file by its first line: a leading decimal digit means the
/// compact layout, anything else (including an empty line) the human one.
pub fn classify_first_line(line: &str) -> LogFormat {
    match line.chars().next() {
        Some(c) if c.is_ascii_digit() => LogFormat::Second,
        _ => LogFormat::First,
    }
}

/// Detect the format of the file at `path` by reading only its first line.
///
/// Returns `None` when the file cannot be read; callers skip such files.
pub fn detect_format(path: &Path) -> Option<LogFormat> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to open file for format detection");
            return None;
        }
    };

    let mut first_line = Vec::new();
    if let Err(e) = BufReader::new(file).read_until(b'\n', &mut first_line) {
        error!(path = %path.display(), error = %e, "Failed to read first line");
        return None;
    }

    let format = classify_first_line(&String::from_utf8_lossy(&first_line));
    debug!(path = %path.display(), format = %format, "Detected log format");
    Some(format)
}
