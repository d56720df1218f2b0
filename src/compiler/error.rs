//! Error types for stylesheet compilation.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn one source file into output.
///
/// These never escape the compile path as faults; the adapter and pipeline
/// convert them into log records.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error compiling {path}: {detail}")]
    Syntax { path: PathBuf, detail: String },

    #[error("Compiler panicked on {path}: {detail}")]
    Panicked { path: PathBuf, detail: String },

    #[error("Error writing {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a recognized source file: {path}")]
    UnsupportedExtension { path: PathBuf },
}
