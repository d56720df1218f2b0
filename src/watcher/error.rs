//! Error types for the watcher.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the filesystem subscription itself.
///
/// Any of these is fatal to the current run once the retry is spent.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("Watch root {path} is no longer accessible")]
    RootUnavailable { path: PathBuf },

    #[error("File system event error: {details}")]
    EventError { details: String },

    #[error("Event channel closed unexpectedly")]
    ChannelClosed,
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}
