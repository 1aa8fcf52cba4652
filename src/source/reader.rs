use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("io error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ReaderError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        ReaderError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Number of lines of a file already consumed by its monitor.
///
/// Seeded once with the file's line count so pre-existing lines are never
/// ingested, then advanced by one per line handed out. Never decreases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipCounter {
    consumed: usize,
}

impl SkipCounter {
    /// Start at an explicit position
    pub fn new(consumed: usize) -> Self {
        Self { consumed }
    }

    /// Seed from the current line count of `path`
    pub fn seed(path: &Path) -> Result<Self, ReaderError> {
        Ok(Self::new(count_lines(path)?))
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    fn advance(&mut self) {
        self.consumed += 1;
    }
}

/// Count the lines currently in `path`. A trailing line without a newline
/// still counts.
pub fn count_lines(path: &Path) -> Result<usize, ReaderError> {
    let file = File::open(path).map_err(|e| ReaderError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    let mut count = 0;

    loop {
        buf.clear();
        let bytes_read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| ReaderError::io(path, e))?;
        if bytes_read == 0 {
            break;
        }
        count += 1;
    }

    Ok(count)
}

/// Re-scan `path` from the start and return every complete line past the
/// skip position, in file order, advancing `skip` once per returned line.
///
/// A trailing line with no newline yet is still being written and is left
/// for a later call.
pub fn read_new_lines(path: &Path, skip: &mut SkipCounter) -> Result<Vec<String>, ReaderError> {
    let file = File::open(path).map_err(|e| ReaderError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    let mut line_number = 0;
    let mut lines = Vec::new();

    loop {
        buf.clear();
        let bytes_read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| ReaderError::io(path, e))?;
        if bytes_read == 0 || buf.last() != Some(&b'\n') {
            break;
        }

        line_number += 1;
        if line_number <= skip.consumed() {
            continue;
        }

        let text = String::from_utf8_lossy(&buf);
        lines.push(text.trim_end_matches(&['\n', '\r'][..]).to_string());
        skip.advance();
    }

    Ok(lines)
}
