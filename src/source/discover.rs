use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DiscoverError {
    #[error("failed to list directory '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A file picked up at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedFile {
    /// Path used for reading and watching
    pub path: PathBuf,
    /// Identifier stored with every record (the file name)
    pub source_file: String,
}

/// List the regular files directly inside `dir`, skipping any whose name
/// matches one of `exclude`. Results are sorted by name.
pub fn discover_files(dir: &Path, exclude: &[Regex]) -> Result<Vec<WatchedFile>, DiscoverError> {
    let map_err = |source| DiscoverError::Io {
        path: dir.display().to_string(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(map_err)? {
        let entry = entry.map_err(map_err)?;

        // Follows symlinks so linked log files are still tailed
        let is_file = std::fs::metadata(entry.path())
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if exclude.iter().any(|re| re.is_match(&name)) {
            debug!(file = %name, "Excluded from watching");
            continue;
        }

        files.push(WatchedFile {
            path: entry.path(),
            source_file: name,
        });
    }

    files.sort_by(|a, b| a.source_file.cmp(&b.source_file));
    Ok(files)
}

/// Exact-name pattern for a file that must never be tailed
pub fn exact_name_pattern(name: &str) -> Regex {
    Regex::new(&format!("^{}$", regex::escape(name))).expect("escaped literal is a valid regex")
}
