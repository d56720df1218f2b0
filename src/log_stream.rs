//! Append-only log of one pipeline run.
//!
//! This is the channel the host reads: records are kept for the whole run so a
//! subscriber that joins late still sees everything from the start, in order.
//! Every record is also mirrored to `tracing`.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => f.write_str("info"),
            Self::Error => f.write_str("error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

impl LogRecord {
    pub fn is_error(&self) -> bool {
        self.level == LogLevel::Error
    }

    /// One line of the host protocol. Errors carry an `ERROR: ` prefix.
    pub fn to_line(&self) -> String {
        match self.level {
            LogLevel::Info => self.message.clone(),
            LogLevel::Error => format!("ERROR: {}", self.message),
        }
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.to_line()
        )
    }
}

#[derive(Debug, Default)]
struct Entries {
    records: Vec<LogRecord>,
    closed: bool,
}

#[derive(Debug, Default)]
struct Shared {
    entries: Mutex<Entries>,
    appended: Notify,
}

/// Shared handle to a run's log. Clones refer to the same log.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    shared: Arc<Shared>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(LogLevel::Info, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(LogLevel::Error, message.into());
    }

    /// Append a record. Records emitted after `close` are dropped.
    pub fn emit(&self, level: LogLevel, message: String) {
        match level {
            LogLevel::Info => tracing::info!(target: "pipeline", "{message}"),
            LogLevel::Error => tracing::error!(target: "pipeline", "{message}"),
        }

        {
            let mut entries = self.shared.entries.lock();
            if entries.closed {
                crate::debug_event!("log", "dropped after close", "{message}");
                return;
            }
            entries.records.push(LogRecord {
                timestamp: Local::now(),
                level,
                message,
            });
        }
        self.shared.appended.notify_waiters();
    }

    /// Mark the end of the run. Subscribers finish after draining.
    pub fn close(&self) {
        self.shared.entries.lock().closed = true;
        self.shared.appended.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.entries.lock().closed
    }

    /// Copy of every record emitted so far.
    pub fn snapshot(&self) -> Vec<LogRecord> {
        self.shared.entries.lock().records.clone()
    }

    pub fn len(&self) -> usize {
        self.shared.entries.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Independent reader starting at the first record.
    pub fn subscribe(&self) -> LogSubscription {
        LogSubscription {
            shared: Arc::clone(&self.shared),
            cursor: 0,
        }
    }
}

/// Ordered reader over a [`RunLog`].
#[derive(Debug)]
pub struct LogSubscription {
    shared: Arc<Shared>,
    cursor: usize,
}

impl LogSubscription {
    /// Next record, waiting for one if needed. `None` once the log is closed and drained.
    pub async fn next(&mut self) -> Option<LogRecord> {
        loop {
            let notified = self.shared.appended.notified();
            tokio::pin!(notified);
            // Register before checking so an append between check and await is not missed
            notified.as_mut().enable();

            {
                let entries = self.shared.entries.lock();
                if let Some(record) = entries.records.get(self.cursor) {
                    self.cursor += 1;
                    return Some(record.clone());
                }
                if entries.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Next record if one is already available.
    pub fn try_next(&mut self) -> Option<LogRecord> {
        let entries = self.shared.entries.lock();
        let record = entries.records.get(self.cursor).cloned()?;
        self.cursor += 1;
        Some(record)
    }
}
