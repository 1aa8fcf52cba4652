use crate::config::parse::{compile_excludes, load_config, ConfigError};
use crate::config::{Config, WatchConfig};
use crate::pipeline::{ingestion_channel, run_sink_writer, WriterStats};
use crate::sink::{run_health_checks, DuckDbSink, Sink, SinkError, SupervisedSink};
use crate::source::discover::{discover_files, exact_name_pattern, DiscoverError, WatchedFile};
use crate::tail::{MonitorExit, NotifyFeed, TailMonitor};
use regex::Regex;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::signal;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("file discovery error: {0}")]
    Discover(#[from] DiscoverError),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub async fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = match config_path {
        Some(path) => {
            info!(config_path = %path.display(), "Loading configuration");
            load_config(&path)?
        }
        None => {
            info!("No config file found, using defaults");
            Config::default()
        }
    };

    run_ingestion(config, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C, running until killed");
        std::future::pending::<()>().await;
    }
}

/// Tail every file in the watch directory into the sink until `shutdown`
/// resolves, then cancel all tasks and wait for them.
///
/// Only startup problems (unreachable sink, unreadable directory) are errors;
/// everything after that is logged and absorbed.
pub async fn run_ingestion(
    config: Config,
    shutdown: impl Future<Output = ()>,
) -> Result<WriterStats, RunError> {
    Ingestion::start(&config).await?.run_until(shutdown).await
}

/// A running ingestion service. Every monitor has subscribed to its file and
/// counted the existing lines by the time [`Ingestion::start`] returns.
pub struct Ingestion {
    sink: Arc<DuckDbSink>,
    cancel: CancellationToken,
    monitors: JoinSet<MonitorExit>,
    writer: JoinHandle<WriterStats>,
    health: JoinHandle<()>,
}

impl Ingestion {
    pub async fn start(config: &Config) -> Result<Self, RunError> {
        info!(path = %config.sink.path.display(), "Opening sink");
        let sink = Arc::new(DuckDbSink::open(&config.sink)?);
        sink.ping().await?;
        let supervised = Arc::new(SupervisedSink::new(sink.clone()));

        let excludes = build_excludes(config)?;
        let files = discover_files(&config.watch.directory, &excludes)?;
        info!(
            directory = %config.watch.directory.display(),
            count = files.len(),
            "Discovered files"
        );

        let cancel = CancellationToken::new();
        let (tx, rx) = ingestion_channel();

        let health = tokio::spawn(run_health_checks(
            supervised.clone(),
            config.sink.health_check_interval,
            cancel.clone(),
        ));

        let mut monitors = JoinSet::new();
        for file in &files {
            if let Some((monitor, feed)) = open_monitor(file, &config.watch) {
                monitors.spawn(monitor.run(feed, tx.clone(), cancel.clone()));
            }
        }
        // Writer sees the channel close once every monitor has stopped
        drop(tx);

        if monitors.is_empty() {
            warn!("No files to tail");
        }

        let writer = tokio::spawn(run_sink_writer(rx, supervised, cancel.clone()));

        info!(monitors = monitors.len(), "Ingestion started, press Ctrl+C to shutdown");

        Ok(Self {
            sink,
            cancel,
            monitors,
            writer,
            health,
        })
    }

    /// The sink records are written to
    pub fn sink(&self) -> &DuckDbSink {
        &self.sink
    }

    /// Number of files being tailed
    pub fn monitor_count(&self) -> usize {
        self.monitors.len()
    }

    /// Keep running until `shutdown` resolves or the writer stops on its own,
    /// then cancel every task and wait for it.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<WriterStats, RunError> {
        let finished = tokio::select! {
            _ = shutdown => {
                info!("Shutdown signal received");
                None
            }
            result = &mut self.writer => Some(result?),
        };
        self.cancel.cancel();

        info!("Waiting for tail monitors to stop");
        while let Some(result) = self.monitors.join_next().await {
            match result {
                Ok(exit) => debug!(reason = ?exit, "Tail monitor finished"),
                Err(e) => error!(error = %e, "Tail monitor task join error"),
            }
        }

        let stats = match finished {
            Some(stats) => stats,
            None => self.writer.await?,
        };
        self.health.await?;

        if let Err(e) = self.sink.close().await {
            warn!(error = %e, "Failed to close sink");
        }

        info!(
            persisted = stats.persisted,
            failed = stats.failed,
            "Shutdown complete"
        );

        Ok(stats)
    }
}

/// Subscribe to `file`, then classify it and count its existing lines.
///
/// Subscribing first means a line appended while counting still raises a
/// notice. If it was already counted, the read it triggers finds nothing new.
fn open_monitor(file: &WatchedFile, watch: &WatchConfig) -> Option<(TailMonitor, NotifyFeed)> {
    let feed = match NotifyFeed::watch(&file.path, watch.mode, watch.poll_interval) {
        Ok(feed) => feed,
        Err(e) => {
            error!(source = %file.source_file, error = %e, "Failed to subscribe to changes");
            return None;
        }
    };

    let Some(monitor) = TailMonitor::start(file, watch.debounce) else {
        warn!(source = %file.source_file, "Unknown format, not tailing");
        return None;
    };

    Some((monitor, feed))
}

/// Configured patterns plus the files this process owns: its own binary and
/// the sink database with its write-ahead log.
fn build_excludes(config: &Config) -> Result<Vec<Regex>, ConfigError> {
    let mut excludes = compile_excludes(&config.watch.exclude)?;

    if let Some(name) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_name().map(|n| n.to_string_lossy().into_owned()))
    {
        excludes.push(exact_name_pattern(&name));
    }

    if let Some(name) = config.sink.path.file_name() {
        let name = name.to_string_lossy();
        excludes.push(exact_name_pattern(&name));
        excludes.push(exact_name_pattern(&format!("{}.wal", name)));
    }

    Ok(excludes)
}
