//! Watch a directory tree for SCSS/SASS changes and compile each changed file
//! to a Unity USS stylesheet next to it.
//!
//! The [`Supervisor`] is the entry point for hosts: it starts and stops a
//! [`CompilePipeline`] and exposes the run's log as a [`LogSubscription`].

pub mod compiler;
pub mod config;
pub mod convention;
pub mod log_stream;
pub mod logging;
pub mod pipeline;
pub mod supervisor;
pub mod watcher;

pub use compiler::{CompileOutcome, CompileResult, CompilerAdapter, GrassCompiler, StyleCompiler};
pub use config::Settings;
pub use convention::FileConvention;
pub use log_stream::{LogLevel, LogRecord, LogSubscription, RunLog};
pub use pipeline::{CompilePipeline, PipelineCommand, PipelineError, PipelineExit, build_all};
pub use supervisor::{PipelineState, Supervisor, SupervisorError};
pub use watcher::{ChangeEvent, ChangeKind, Debouncer, DirectoryWatcher, WatchError};
