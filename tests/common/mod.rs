//! Shared helpers for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use logfunnel::sink::{DuckDbSink, Sink, SinkError, StoredRecord};
use logfunnel::source::{LogRecord, WatchedFile};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Semaphore;

pub fn append(path: &Path, text: &str) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file.flush().unwrap();
}

pub fn watched(dir: &TempDir, name: &str, contents: &str) -> WatchedFile {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    WatchedFile {
        path,
        source_file: name.to_string(),
    }
}

/// Poll `records` until at least `count` rows exist or the deadline passes
pub async fn wait_for_records(sink: &DuckDbSink, count: usize, deadline: Duration) -> Vec<StoredRecord> {
    let start = tokio::time::Instant::now();
    loop {
        let rows = sink.records().await.unwrap();
        if rows.len() >= count || start.elapsed() >= deadline {
            return rows;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// In-memory sink whose connection can be knocked out. While down, pings and
/// inserts fail until `reconnect` is called. Rows survive the outage.
pub struct FlakySink {
    pub inner: DuckDbSink,
    down: AtomicBool,
    pub reconnects: AtomicUsize,
}

impl FlakySink {
    pub fn new() -> Self {
        Self {
            inner: DuckDbSink::in_memory("newLogs", "logs").unwrap(),
            down: AtomicBool::new(false),
            reconnects: AtomicUsize::new(0),
        }
    }

    pub fn take_down(&self) {
        self.down.store(true, Ordering::SeqCst);
    }

    pub fn is_down(&self) -> bool {
        self.down.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sink for FlakySink {
    async fn insert(&self, record: &LogRecord) -> Result<(), SinkError> {
        if self.is_down() {
            return Err(SinkError::Disconnected);
        }
        self.inner.insert(record).await
    }

    async fn ping(&self) -> Result<(), SinkError> {
        if self.is_down() {
            return Err(SinkError::Disconnected);
        }
        self.inner.ping().await
    }

    async fn reconnect(&self) -> Result<(), SinkError> {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        self.down.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory sink whose inserts wait for a permit, to hold the writer busy
pub struct GatedSink {
    pub inner: DuckDbSink,
    pub gate: Semaphore,
}

impl GatedSink {
    pub fn closed() -> Self {
        Self {
            inner: DuckDbSink::in_memory("newLogs", "logs").unwrap(),
            gate: Semaphore::new(0),
        }
    }
}

#[async_trait]
impl Sink for GatedSink {
    async fn insert(&self, record: &LogRecord) -> Result<(), SinkError> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| SinkError::Generic(e.to_string()))?;
        permit.forget();
        self.inner.insert(record).await
    }

    async fn ping(&self) -> Result<(), SinkError> {
        self.inner.ping().await
    }

    async fn reconnect(&self) -> Result<(), SinkError> {
        self.inner.reconnect().await
    }
}
