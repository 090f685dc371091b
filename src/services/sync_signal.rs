//! Cross-surface sync signal for Kizuna.
//!
//! A payload-free invalidation bus: any surface that mutates bookmarks calls
//! `broadcast()`, and every subscribed surface refetches. Delivery is
//! best-effort and at-least-once; receivers must treat a signal as idempotent.
//!
//! Two implementations:
//! - [`LocalSyncBus`] fans out inside one process.
//! - [`FileSyncBus`] writes a unique stamp to a shared file that other
//!   processes watch, so a signal outlives the surface that sent it.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::errors::SyncError;

/// Publish/subscribe invalidation bus shared by all surfaces.
pub trait SyncBus: Send + Sync {
    /// Announces that some mutation happened. Never fails to the caller.
    fn broadcast(&self);
    /// Starts listening. Dropping the subscription unsubscribes.
    fn subscribe(&self) -> SyncSubscription;
}

enum Source {
    Local(broadcast::Receiver<()>),
    Watched {
        rx: mpsc::Receiver<()>,
        // Dropping the watcher stops it.
        _watcher: RecommendedWatcher,
    },
    Polled {
        rx: mpsc::Receiver<()>,
        poller: JoinHandle<()>,
    },
}

/// Handle to a live subscription.
pub struct SyncSubscription {
    source: Source,
}

impl SyncSubscription {
    /// Waits for the next signal. Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<()> {
        match &mut self.source {
            Source::Local(rx) => match rx.recv().await {
                Ok(()) => Some(()),
                // Missed signals collapse into one; a refetch covers them all.
                Err(broadcast::error::RecvError::Lagged(_)) => Some(()),
                Err(broadcast::error::RecvError::Closed) => None,
            },
            Source::Watched { rx, .. } | Source::Polled { rx, .. } => rx.recv().await,
        }
    }

    /// Consumes a pending signal without waiting.
    pub fn try_recv(&mut self) -> bool {
        match &mut self.source {
            Source::Local(rx) => matches!(
                rx.try_recv(),
                Ok(()) | Err(broadcast::error::TryRecvError::Lagged(_))
            ),
            Source::Watched { rx, .. } | Source::Polled { rx, .. } => rx.try_recv().is_ok(),
        }
    }
}

impl Drop for SyncSubscription {
    fn drop(&mut self) {
        if let Source::Polled { poller, .. } = &self.source {
            poller.abort();
        }
    }
}

// === LocalSyncBus ===

/// In-process bus for single-surface deployments and tests.
#[derive(Clone)]
pub struct LocalSyncBus {
    tx: broadcast::Sender<()>,
}

impl LocalSyncBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }
}

impl Default for LocalSyncBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncBus for LocalSyncBus {
    fn broadcast(&self) {
        // Err only means nobody is listening right now.
        let _ = self.tx.send(());
    }

    fn subscribe(&self) -> SyncSubscription {
        SyncSubscription {
            source: Source::Local(self.tx.subscribe()),
        }
    }
}

// === FileSyncBus ===

/// Durable bus backed by a stamp file shared between processes.
///
/// Subscribers watch the file's directory for changes. When no watcher can be
/// started they poll the file every `poll_interval` instead, which needs a
/// Tokio runtime.
pub struct FileSyncBus {
    path: PathBuf,
    poll_interval: Duration,
}

impl FileSyncBus {
    pub fn new<P: Into<PathBuf>>(path: P, poll_interval: Duration) -> Self {
        Self {
            path: path.into(),
            poll_interval,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes a fresh stamp and returns it.
    ///
    /// The stamp is written to a sibling file and renamed into place so pollers
    /// never observe a half-written value.
    pub fn write_stamp(&self) -> Result<String, SyncError> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let stamp = format!("{}-{}", millis, Uuid::new_v4());

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SyncError::IoError(e.to_string()))?;
        }
        let tmp = self.path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        std::fs::write(&tmp, &stamp).map_err(|e| SyncError::IoError(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| SyncError::IoError(e.to_string()))?;
        Ok(stamp)
    }

    /// Stamp currently in the file, if any.
    pub fn current_stamp(&self) -> Option<String> {
        parse_stamp(std::fs::read_to_string(&self.path).ok())
    }

    async fn read_stamp(path: &Path) -> Option<String> {
        parse_stamp(tokio::fs::read_to_string(path).await.ok())
    }
}

fn parse_stamp(content: Option<String>) -> Option<String> {
    content
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl SyncBus for FileSyncBus {
    fn broadcast(&self) {
        match self.write_stamp() {
            Ok(stamp) => debug!(path = %self.path.display(), %stamp, "sync signal written"),
            Err(err) => warn!(path = %self.path.display(), error = %err, "failed to write sync signal"),
        }
    }

    fn subscribe(&self) -> SyncSubscription {
        let (tx, rx) = mpsc::channel(1);
        // Baseline taken before returning so a broadcast right after subscribing is seen.
        let last_seen = self.current_stamp();

        match self.watch(tx.clone(), last_seen.clone()) {
            Ok(watcher) => SyncSubscription {
                source: Source::Watched {
                    rx,
                    _watcher: watcher,
                },
            },
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "file watcher unavailable, polling sync signal");
                SyncSubscription {
                    source: Source::Polled {
                        rx,
                        poller: self.poll(tx, last_seen),
                    },
                }
            }
        }
    }
}

impl FileSyncBus {
    /// Watches the stamp file's directory; the stamp is replaced by rename, so
    /// the file itself cannot be watched.
    fn watch(
        &self,
        tx: mpsc::Sender<()>,
        mut last_seen: Option<String>,
    ) -> notify::Result<RecommendedWatcher> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(notify::Error::io)?;

        let path = self.path.clone();
        let file_name = path.file_name().map(|name| name.to_os_string());
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let touches_stamp = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if !touches_stamp {
                        return;
                    }
                    let current = parse_stamp(std::fs::read_to_string(&path).ok());
                    if current.is_none() || current == last_seen {
                        return;
                    }
                    last_seen = current;
                    // Full means a signal is already pending; closed means nobody listens.
                    let _ = tx.try_send(());
                }
                Err(err) => warn!(error = %err, "sync signal watcher error"),
            },
            NotifyConfig::default(),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        debug!(path = %self.path.display(), "watching sync signal");
        Ok(watcher)
    }

    fn poll(&self, tx: mpsc::Sender<()>, mut last_seen: Option<String>) -> JoinHandle<()> {
        let path = self.path.clone();
        let poll_interval = self.poll_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let current = FileSyncBus::read_stamp(&path).await;
                if current.is_none() || current == last_seen {
                    continue;
                }
                last_seen = current;
                match tx.try_send(()) {
                    // Full means a signal is already pending, which is enough.
                    Ok(()) | Err(mpsc::error::TrySendError::Full(())) => {}
                    Err(mpsc::error::TrySendError::Closed(())) => break,
                }
            }
        })
    }
}
