//! Command implementations for the CLI.
//!
//! Each command is implemented in its own module.

pub mod build;
pub mod host;
pub mod init;
pub mod watch;

use sass_to_uss::LogRecord;

/// Print a log record on the stream matching its level.
pub(crate) fn print_record(record: &LogRecord) {
    if record.is_error() {
        eprintln!("{}", record.to_line());
    } else {
        println!("{}", record.to_line());
    }
}
