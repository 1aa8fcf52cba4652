use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub sink: SinkConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Directory whose files are tailed (not recursive)
    pub directory: PathBuf,
    /// Regexes matched against file names that must not be tailed
    pub exclude: Vec<String>,
    /// Delay between a write notification and the read
    #[serde(with = "humantime_serde")]
    pub debounce: Duration,
    pub mode: WatchMode,
    /// Only used by the poll backend
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            exclude: Vec::new(),
            debounce: Duration::from_secs(1),
            mode: WatchMode::Native,
            poll_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchMode {
    /// inotify / FSEvents / ReadDirectoryChangesW
    Native,
    /// Stat-based polling, for filesystems without native events
    Poll,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// DuckDB database file
    pub path: PathBuf,
    /// Logical database, stored as a schema
    pub database: String,
    /// Collection, stored as a table inside `database`
    pub collection: String,
    #[serde(with = "humantime_serde")]
    pub health_check_interval: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("logfunnel.duckdb"),
            database: "newLogs".to_string(),
            collection: "logs".to_string(),
            health_check_interval: Duration::from_secs(1),
        }
    }
}
