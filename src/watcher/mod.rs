//! Filesystem watching for stylesheet sources.
//!
//! This module turns raw notify events into per-file compile triggers.
//!
//! # Architecture
//!
//! ```text
//! DirectoryWatcher (notify, recursive)
//!   - filters by source extension
//!   - maps notify kinds to ChangeKind
//!         |
//!     ChangeEvent
//!         |
//! Debouncer (one timer task per path)
//!         |
//!     CompileDue
//! ```

mod debouncer;
mod directory;
mod error;
mod event;

pub use debouncer::{CompileDue, Debouncer};
pub use directory::DirectoryWatcher;
pub use error::WatchError;
pub use event::{ChangeEvent, ChangeKind};
