//! Per-path debouncing of file change events.
//!
//! Debouncing prevents recompiling a stylesheet several times when it is saved
//! in quick succession (editor auto-save, formatters writing twice). Each path
//! gets its own timer task; a new event for the path aborts the old timer and
//! starts a fresh one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::event::{ChangeEvent, ChangeKind};

/// Signal that a path has been quiet for the full interval and should be compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileDue {
    pub path: PathBuf,
    generation: u64,
}

/// Debounce state for one source path.
#[derive(Debug)]
struct PendingCompile {
    last_event: Instant,
    generation: u64,
    timer: JoinHandle<()>,
}

/// Coalesces bursts of events per path into one [`CompileDue`] signal.
///
/// Must be used from within a tokio runtime. The pending set is owned by
/// whoever holds the debouncer; timer tasks only send on the channel.
#[derive(Debug)]
pub struct Debouncer {
    /// Pending compiles: path -> timer and its generation.
    pending: HashMap<PathBuf, PendingCompile>,
    /// How long a file must be quiet before it is compiled.
    duration: Duration,
    next_generation: u64,
    due_tx: mpsc::UnboundedSender<CompileDue>,
}

impl Debouncer {
    /// Create a debouncer and the receiver its timers fire into.
    pub fn new(duration: Duration) -> (Self, mpsc::UnboundedReceiver<CompileDue>) {
        let (due_tx, due_rx) = mpsc::unbounded_channel();
        let debouncer = Self {
            pending: HashMap::new(),
            duration,
            next_generation: 0,
            due_tx,
        };
        (debouncer, due_rx)
    }

    /// Feed one change event. Removals cancel, everything else (re)schedules.
    pub fn observe(&mut self, event: ChangeEvent) {
        match event.kind {
            ChangeKind::Removed => {
                if self.cancel(&event.path) {
                    crate::debug_event!("debounce", "cancelled", "{}", event.path.display());
                }
            }
            ChangeKind::Created | ChangeKind::Modified => self.record(event.path, event.timestamp),
        }
    }

    /// Record a change, resetting the timer for this path.
    pub fn record(&mut self, path: PathBuf, at: Instant) {
        if let Some(previous) = self.pending.remove(&path) {
            previous.timer.abort();
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let tx = self.due_tx.clone();
        let duration = self.duration;
        let due_path = path.clone();

        let timer = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            // Receiver gone means the pipeline stopped
            let _ = tx.send(CompileDue {
                path: due_path,
                generation,
            });
        });

        self.pending.insert(
            path,
            PendingCompile {
                last_event: at,
                generation,
                timer,
            },
        );
    }

    /// Cancel the pending timer for `path`. Returns true if one existed.
    pub fn cancel(&mut self, path: &Path) -> bool {
        match self.pending.remove(path) {
            Some(pending) => {
                pending.timer.abort();
                true
            }
            None => false,
        }
    }

    /// Claim a fired signal.
    ///
    /// Returns false for a signal that was overtaken by a later event for the
    /// same path (the timer fired just before it was reset) or by a removal.
    pub fn take_due(&mut self, due: &CompileDue) -> bool {
        match self.pending.get(&due.path) {
            Some(pending) if pending.generation == due.generation => {
                self.pending.remove(&due.path);
                true
            }
            _ => false,
        }
    }

    /// Abort every pending timer.
    pub fn cancel_all(&mut self) {
        for (_, pending) in self.pending.drain() {
            pending.timer.abort();
        }
    }

    /// Time of the last event recorded for `path`, if a compile is pending.
    pub fn last_event(&self, path: &Path) -> Option<Instant> {
        self.pending.get(path).map(|p| p.last_event)
    }

    /// Check if there are any pending changes.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
