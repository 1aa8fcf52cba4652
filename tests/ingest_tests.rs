/// Integration tests for the tail -> channel -> writer -> sink path
///
/// Monitors are driven through hand-fed change notices so the tests do not
/// depend on OS notification timing.
mod common;

use common::{append, wait_for_records, watched, FlakySink, GatedSink};
use logfunnel::pipeline::{ingestion_channel, run_sink_writer};
use logfunnel::sink::{DuckDbSink, HealthStatus, Sink, SupervisedSink};
use logfunnel::source::LogFormat;
use logfunnel::tail::{channel_feed, MonitorExit, TailMonitor};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_appended_lines_reach_sink() {
    let dir = TempDir::new().unwrap();
    let file = watched(&dir, "a.log", "Jan 2, 2006 at 3:04:05pm (UTC) | hello\n");

    let monitor = TailMonitor::start(&file, Duration::from_millis(10)).unwrap();
    assert_eq!(monitor.format(), LogFormat::First);
    assert_eq!(monitor.consumed(), 1);

    let sink = Arc::new(DuckDbSink::in_memory("newLogs", "logs").unwrap());
    let supervised = Arc::new(SupervisedSink::new(sink.clone()));

    let cancel = CancellationToken::new();
    let (trigger, feed) = channel_feed();
    let (tx, rx) = ingestion_channel();
    let monitor_handle = tokio::spawn(monitor.run(feed, tx, cancel.clone()));
    let writer_handle = tokio::spawn(run_sink_writer(rx, supervised, cancel.clone()));

    append(
        &file.path,
        "Jan 3, 2006 at 3:04:05pm (UTC) | world\nJan 4, 2006 at 3:04:05pm (UTC) | again\n",
    );
    trigger.write();

    let rows = wait_for_records(&sink, 2, WAIT).await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].log_msg, "world");
    assert_eq!(rows[1].log_msg, "again");
    for row in &rows {
        assert_eq!(row.file_name, "a.log");
        assert_eq!(row.log_format, "first_format");
    }
    assert_eq!(
        rows[0].log_time.unwrap().to_rfc3339(),
        "2006-01-03T15:04:05+00:00"
    );
    assert_eq!(
        rows[1].log_time.unwrap().to_rfc3339(),
        "2006-01-04T15:04:05+00:00"
    );

    cancel.cancel();
    assert_eq!(monitor_handle.await.unwrap(), MonitorExit::Cancelled);
    let stats = writer_handle.await.unwrap();
    assert_eq!(stats.persisted, 2);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn test_repeated_notices_do_not_duplicate() {
    let dir = TempDir::new().unwrap();
    let file = watched(&dir, "b.log", "2006-02-01T15:04:05Z | existing\n");
    let monitor = TailMonitor::start(&file, Duration::ZERO).unwrap();
    assert_eq!(monitor.format(), LogFormat::Second);

    let sink = Arc::new(DuckDbSink::in_memory("newLogs", "logs").unwrap());
    let supervised = Arc::new(SupervisedSink::new(sink.clone()));

    let cancel = CancellationToken::new();
    let (trigger, feed) = channel_feed();
    let (tx, rx) = ingestion_channel();
    let monitor_handle = tokio::spawn(monitor.run(feed, tx, cancel.clone()));
    let writer_handle = tokio::spawn(run_sink_writer(rx, supervised, cancel.clone()));

    append(&file.path, "2006-03-01T10:00:00Z | first\n");
    trigger.write();
    wait_for_records(&sink, 1, WAIT).await;

    // Nothing new on disk: these must not re-read old lines
    trigger.write();
    trigger.write();
    tokio::time::sleep(Duration::from_millis(100)).await;

    append(&file.path, "2006-03-01T10:00:01Z | second\n");
    trigger.write();
    let rows = wait_for_records(&sink, 2, WAIT).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let rows_after = sink.records().await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows_after, rows);
    assert_eq!(rows[0].log_msg, "first");
    assert_eq!(rows[1].log_msg, "second");
    // Day comes before month in this layout
    assert_eq!(
        rows[0].log_time.unwrap().to_rfc3339(),
        "2006-01-03T10:00:00+00:00"
    );

    cancel.cancel();
    monitor_handle.await.unwrap();
    writer_handle.await.unwrap();
}

#[tokio::test]
async fn test_format_stays_fixed_and_bad_lines_survive() {
    let dir = TempDir::new().unwrap();
    let file = watched(&dir, "a.log", "Jan 2, 2006 at 3:04:05pm (UTC) | hello\n");
    let monitor = TailMonitor::start(&file, Duration::ZERO).unwrap();

    let sink = Arc::new(DuckDbSink::in_memory("newLogs", "logs").unwrap());
    let supervised = Arc::new(SupervisedSink::new(sink.clone()));

    let cancel = CancellationToken::new();
    let (trigger, feed) = channel_feed();
    let (tx, rx) = ingestion_channel();
    let monitor_handle = tokio::spawn(monitor.run(feed, tx, cancel.clone()));
    let writer_handle = tokio::spawn(run_sink_writer(rx, supervised, cancel.clone()));

    // A second-format line in a first-format file keeps the first format
    append(
        &file.path,
        "2006-03-01T10:00:00Z | mismatched\nno delimiter here\n",
    );
    trigger.write();

    let rows = wait_for_records(&sink, 2, WAIT).await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].log_msg, "mismatched");
    assert_eq!(rows[0].log_format, "first_format");
    assert_eq!(rows[0].log_time, None);
    assert_eq!(rows[1].log_msg, "no delimiter here");
    assert_eq!(rows[1].log_time, None);

    cancel.cancel();
    monitor_handle.await.unwrap();
    writer_handle.await.unwrap();
}

#[tokio::test]
async fn test_slow_sink_applies_backpressure_without_loss() {
    let dir = TempDir::new().unwrap();
    let file_a = watched(&dir, "a.log", "");
    let file_b = watched(&dir, "b.log", "");

    let sink = Arc::new(GatedSink::closed());
    let supervised = Arc::new(SupervisedSink::new(sink.clone()));

    let cancel = CancellationToken::new();
    let (tx, rx) = ingestion_channel();

    let (trigger_a, feed_a) = channel_feed();
    let (trigger_b, feed_b) = channel_feed();
    let monitor_a = TailMonitor::start(&file_a, Duration::ZERO).unwrap();
    let monitor_b = TailMonitor::start(&file_b, Duration::ZERO).unwrap();
    let handle_a = tokio::spawn(monitor_a.run(feed_a, tx.clone(), cancel.clone()));
    let handle_b = tokio::spawn(monitor_b.run(feed_b, tx, cancel.clone()));
    let writer_handle = tokio::spawn(run_sink_writer(rx, supervised, cancel.clone()));

    append(&file_a.path, "x | a1\nx | a2\nx | a3\n");
    trigger_a.write();
    append(&file_b.path, "x | b1\n");
    trigger_b.write();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(sink.inner.records().await.unwrap().is_empty());
    assert!(!handle_a.is_finished());
    assert!(!handle_b.is_finished());

    sink.gate.add_permits(4);
    let rows = wait_for_records(&sink.inner, 4, WAIT).await;
    assert_eq!(rows.len(), 4);

    let from_a: Vec<&str> = rows
        .iter()
        .filter(|r| r.file_name == "a.log")
        .map(|r| r.log_msg.as_str())
        .collect();
    assert_eq!(from_a, vec!["a1", "a2", "a3"]);
    assert!(rows.iter().any(|r| r.file_name == "b.log" && r.log_msg == "b1"));

    cancel.cancel();
    assert_eq!(handle_a.await.unwrap(), MonitorExit::Cancelled);
    assert_eq!(handle_b.await.unwrap(), MonitorExit::Cancelled);
    assert_eq!(writer_handle.await.unwrap().persisted, 4);
}

#[tokio::test]
async fn test_lost_connection_recovers_before_insert() {
    let dir = TempDir::new().unwrap();
    let file = watched(&dir, "a.log", "");

    let sink = Arc::new(FlakySink::new());
    let supervised = Arc::new(SupervisedSink::new(sink.clone()));

    let cancel = CancellationToken::new();
    let (trigger, feed) = channel_feed();
    let (tx, rx) = ingestion_channel();
    let monitor = TailMonitor::start(&file, Duration::ZERO).unwrap();
    let monitor_handle = tokio::spawn(monitor.run(feed, tx, cancel.clone()));
    let writer_handle = tokio::spawn(run_sink_writer(rx, supervised.clone(), cancel.clone()));

    sink.take_down();
    append(&file.path, "x | after outage\n");
    trigger.write();

    let rows = wait_for_records(&sink.inner, 1, WAIT).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].log_msg, "after outage");
    assert_eq!(sink.reconnects.load(Ordering::SeqCst), 1);
    assert_eq!(supervised.ensure_healthy().await, HealthStatus::Healthy);

    cancel.cancel();
    monitor_handle.await.unwrap();
    let stats = writer_handle.await.unwrap();
    assert_eq!(stats.persisted, 1);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn test_cancel_stops_every_task() {
    let dir = TempDir::new().unwrap();
    let file = watched(&dir, "a.log", "");

    let sink: Arc<dyn Sink> = Arc::new(GatedSink::closed());
    let supervised = Arc::new(SupervisedSink::new(sink));

    let cancel = CancellationToken::new();
    let (trigger, feed) = channel_feed();
    let (tx, rx) = ingestion_channel();
    let monitor = TailMonitor::start(&file, Duration::from_secs(60)).unwrap();
    let monitor_handle = tokio::spawn(monitor.run(feed, tx, cancel.clone()));
    let writer_handle = tokio::spawn(run_sink_writer(rx, supervised, cancel.clone()));

    // Monitor parks in its debounce delay
    append(&file.path, "x | never read\n");
    trigger.write();
    tokio::time::sleep(Duration::from_millis(50)).await;

    cancel.cancel();
    let exit = tokio::time::timeout(WAIT, monitor_handle)
        .await
        .expect("monitor should stop")
        .unwrap();
    assert_eq!(exit, MonitorExit::Cancelled);

    let stats = tokio::time::timeout(WAIT, writer_handle)
        .await
        .expect("writer should stop")
        .unwrap();
    assert_eq!(stats.persisted, 0);
}
