//! Change notifications for a single tailed file.
//!
//! A monitor only needs to know "the file was written to" versus "something
//! else happened", so every backend is reduced to a [`ChangeNotice`] stream.

use crate::config::types::WatchMode;
use async_trait::async_trait;
use notify::event::{MetadataKind, ModifyKind};
use notify::{Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to watch '{path}': {source}")]
    Watch {
        path: String,
        #[source]
        source: notify::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeNotice {
    /// File content was written
    Write,
    /// Any other filesystem event (access, metadata, rename, ...)
    Other,
    /// The notification backend reported an error
    Error(String),
}

/// Source of change notices for one file.
#[async_trait]
pub trait ChangeFeed: Send {
    /// Wait for the next notice. `None` once the feed is closed.
    async fn next(&mut self) -> Option<ChangeNotice>;

    /// Take an already pending notice without waiting
    fn try_next(&mut self) -> Option<ChangeNotice>;
}

/// Reduce a raw `notify` event to a notice
pub fn classify_event(result: notify::Result<Event>) -> ChangeNotice {
    match result {
        Ok(event) => match event.kind {
            EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Any)
            | EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)) => {
                ChangeNotice::Write
            }
            _ => ChangeNotice::Other,
        },
        Err(e) => ChangeNotice::Error(e.to_string()),
    }
}

/// Writes still waiting to be read. One is enough: every read rescans from
/// the skip position, so further write events carry nothing new.
const PENDING_WRITES: usize = 1;

/// Backend errors kept for the monitor to log; extras are dropped.
const PENDING_ERRORS: usize = 16;

/// Feed backed by the `notify` crate. Dropping it releases the subscription.
///
/// Events are reduced inside the watcher callback so the queues stay bounded
/// while the monitor is blocked handing records to the writer. Events other
/// than writes are discarded there.
pub struct NotifyFeed {
    path: PathBuf,
    _watcher: Box<dyn Watcher + Send>,
    writes: mpsc::Receiver<()>,
    errors: mpsc::Receiver<String>,
}

impl NotifyFeed {
    /// Subscribe to changes of `path` using the given backend
    pub fn watch(path: &Path, mode: WatchMode, poll_interval: Duration) -> Result<Self, FeedError> {
        let map_err = |source| FeedError::Watch {
            path: path.display().to_string(),
            source,
        };

        let (write_tx, writes) = mpsc::channel(PENDING_WRITES);
        let (error_tx, errors) = mpsc::channel(PENDING_ERRORS);
        let handler = move |res: notify::Result<Event>| match classify_event(res) {
            // Full means a write is already pending
            ChangeNotice::Write => {
                let _ = write_tx.try_send(());
            }
            ChangeNotice::Error(e) => {
                let _ = error_tx.try_send(e);
            }
            ChangeNotice::Other => {}
        };

        let mut watcher: Box<dyn Watcher + Send> = match mode {
            WatchMode::Native => Box::new(notify::recommended_watcher(handler).map_err(map_err)?),
            WatchMode::Poll => Box::new(
                PollWatcher::new(
                    handler,
                    notify::Config::default().with_poll_interval(poll_interval),
                )
                .map_err(map_err)?,
            ),
        };
        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(map_err)?;

        debug!(path = %path.display(), mode = ?mode, "Subscribed to file changes");

        Ok(Self {
            path: path.to_path_buf(),
            _watcher: watcher,
            writes,
            errors,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ChangeFeed for NotifyFeed {
    async fn next(&mut self) -> Option<ChangeNotice> {
        tokio::select! {
            biased;
            Some(e) = self.errors.recv() => Some(ChangeNotice::Error(e)),
            Some(()) = self.writes.recv() => Some(ChangeNotice::Write),
            else => None,
        }
    }

    fn try_next(&mut self) -> Option<ChangeNotice> {
        if let Ok(e) = self.errors.try_recv() {
            return Some(ChangeNotice::Error(e));
        }
        self.writes.try_recv().ok().map(|()| ChangeNotice::Write)
    }
}

/// Feed driven by hand through a [`ChangeTrigger`].
pub struct ChannelFeed {
    notices: mpsc::UnboundedReceiver<ChangeNotice>,
}

/// Sending half of a [`ChannelFeed`]. The feed closes when every trigger is dropped.
#[derive(Debug, Clone)]
pub struct ChangeTrigger {
    tx: mpsc::UnboundedSender<ChangeNotice>,
}

impl ChangeTrigger {
    /// Deliver a notice; returns false if the feed is gone
    pub fn notify(&self, notice: ChangeNotice) -> bool {
        self.tx.send(notice).is_ok()
    }

    pub fn write(&self) -> bool {
        self.notify(ChangeNotice::Write)
    }
}

pub fn channel_feed() -> (ChangeTrigger, ChannelFeed) {
    let (tx, notices) = mpsc::unbounded_channel();
    (ChangeTrigger { tx }, ChannelFeed { notices })
}

#[async_trait]
impl ChangeFeed for ChannelFeed {
    async fn next(&mut self) -> Option<ChangeNotice> {
        self.notices.recv().await
    }

    fn try_next(&mut self) -> Option<ChangeNotice> {
        self.notices.try_recv().ok()
    }
}
