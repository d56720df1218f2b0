//! Recursive directory subscription built on notify.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::convention::FileConvention;

use super::error::WatchError;
use super::event::{ChangeEvent, ChangeKind};

/// Live subscription to changes below a root directory.
///
/// Dropping the watcher ends the subscription. A new one can be started for the
/// same root afterwards.
pub struct DirectoryWatcher {
    root: PathBuf,
    convention: FileConvention,
    /// Channel for receiving raw notify events.
    event_rx: mpsc::Receiver<notify::Result<Event>>,
    /// Classified events not handed out yet (one notify event can carry several paths).
    buffered: VecDeque<ChangeEvent>,
    /// The underlying file watcher.
    _watcher: RecommendedWatcher,
}

impl std::fmt::Debug for DirectoryWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryWatcher")
            .field("root", &self.root)
            .field("buffered", &self.buffered.len())
            .finish_non_exhaustive()
    }
}

impl DirectoryWatcher {
    /// Subscribe to `root` recursively.
    pub fn start(
        root: &Path,
        convention: FileConvention,
        capacity: usize,
    ) -> Result<Self, WatchError> {
        let (tx, rx) = mpsc::channel(capacity.max(1));

        // The callback runs on notify's own thread, never inside the runtime
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        })?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: root.to_path_buf(),
                reason: e.to_string(),
            })?;

        crate::debug_event!("watcher", "subscribed", "{}", root.display());

        Ok(Self {
            root: root.to_path_buf(),
            convention,
            event_rx: rx,
            buffered: VecDeque::new(),
            _watcher: watcher,
        })
    }

    /// Wait for the next qualifying change.
    ///
    /// Returns `None` once the underlying notify watcher has gone away.
    pub async fn next_event(&mut self) -> Option<Result<ChangeEvent, WatchError>> {
        loop {
            if let Some(event) = self.buffered.pop_front() {
                return Some(Ok(event));
            }

            match self.event_rx.recv().await? {
                Ok(event) => match classify(&event, &self.root, &self.convention) {
                    Ok(changes) => self.buffered.extend(changes),
                    Err(e) => return Some(Err(e)),
                },
                Err(e) => {
                    if !self.root.is_dir() {
                        return Some(Err(WatchError::RootUnavailable {
                            path: self.root.clone(),
                        }));
                    }
                    return Some(Err(WatchError::EventError {
                        details: e.to_string(),
                    }));
                }
            }
        }
    }
}

/// Turn one notify event into the source-file changes it describes.
fn classify(
    event: &Event,
    root: &Path,
    convention: &FileConvention,
) -> Result<Vec<ChangeEvent>, WatchError> {
    if event.paths.iter().any(|p| p == root) && !root.is_dir() {
        return Err(WatchError::RootUnavailable {
            path: root.to_path_buf(),
        });
    }

    let changes = event
        .paths
        .iter()
        .filter(|path| convention.is_source(path))
        .filter_map(|path| {
            let kind = change_kind(&event.kind, path)?;
            crate::debug_event!("watcher", kind, "{}", path.display());
            Some(ChangeEvent::new(path.clone(), kind))
        })
        .collect();

    Ok(changes)
}

fn change_kind(kind: &EventKind, path: &Path) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        // Renames report both ends; whichever side still exists was created
        EventKind::Modify(ModifyKind::Name(_)) => {
            if path.exists() {
                Some(ChangeKind::Created)
            } else {
                Some(ChangeKind::Removed)
            }
        }
        EventKind::Modify(_) | EventKind::Any => Some(ChangeKind::Modified),
        EventKind::Remove(_) => Some(ChangeKind::Removed),
        EventKind::Access(_) | EventKind::Other => None,
    }
}
