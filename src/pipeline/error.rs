//! Error types for pipeline start-up and watch failures.

use std::path::PathBuf;
use thiserror::Error;

use crate::watcher::WatchError;

/// Errors that end (or prevent) a pipeline run.
///
/// Per-file compile and write failures are not here; they are logged and the
/// run goes on.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Watch root {path} does not exist")]
    RootMissing { path: PathBuf },

    #[error("Watch root {path} is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("Failed to create directory {path}: {source}")]
    CreateRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read watch root {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Watch(#[from] WatchError),
}
