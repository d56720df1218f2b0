//! Foreground watch until Ctrl-C.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use sass_to_uss::{Settings, Supervisor};

use super::print_record;

/// Watch `dir` and print the run's log until interrupted.
///
/// Exits non-zero when the root is unusable or the watch fails on its own.
pub async fn run(settings: Arc<Settings>, dir: PathBuf) -> anyhow::Result<ExitCode> {
    let supervisor = Supervisor::new(settings);
    let started = supervisor.start(&dir).await;

    let mut log = supervisor.subscribe_log();
    let mut printer = tokio::spawn(async move {
        while let Some(record) = log.next().await {
            print_record(&record);
        }
    });

    if started.is_err() {
        // The reason is already in the log
        let _ = printer.await;
        return Ok(ExitCode::FAILURE);
    }

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            supervisor.stop().await;
            printer.await.context("log printer failed")?;
            Ok(ExitCode::SUCCESS)
        }
        // The log only closes early when the watch failed for good
        printed = &mut printer => {
            printed.context("log printer failed")?;
            supervisor.stop().await;
            Ok(ExitCode::FAILURE)
        }
    }
}
