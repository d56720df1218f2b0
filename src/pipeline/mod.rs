//! Watch-debounce-compile pipeline.
//!
//! A run goes Starting -> Running -> Stopping:
//!
//! - [`CompilePipeline::prepare`] validates (and if needed creates) the watch
//!   root and subscribes to it. Failure here ends the run before it starts.
//! - [`CompilePipeline::run`] feeds watcher events into the debouncer and hands
//!   fired paths to a single compile worker. Per-file failures are logged and
//!   the run continues.
//! - A [`PipelineCommand::Stop`] (or a fatal watch error) drops the
//!   subscription, aborts pending timers, waits for an in-flight compile and
//!   logs `Stopped`.

mod build;
mod error;
mod worker;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;

pub use build::build_all;
pub use error::PipelineError;
pub use worker::compile_to_disk;

use crate::compiler::CompilerAdapter;
use crate::config::Settings;
use crate::log_stream::RunLog;
use crate::watcher::{Debouncer, DirectoryWatcher, WatchError};
use worker::CompileWorker;

/// Control messages from the host side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineCommand {
    Stop,
}

/// How a run ended.
#[derive(Debug)]
pub enum PipelineExit {
    /// Stopped on request.
    Stopped,
    /// The watch subscription failed and could not be re-established.
    Failed(WatchError),
}

/// A prepared pipeline run, ready to be driven by [`CompilePipeline::run`].
#[derive(Debug)]
pub struct CompilePipeline {
    root: PathBuf,
    settings: Arc<Settings>,
    adapter: CompilerAdapter,
    watcher: DirectoryWatcher,
    log: RunLog,
}

impl CompilePipeline {
    /// Starting phase: resolve the root, create it if allowed, subscribe.
    ///
    /// A failure is logged to `log` as a single error record.
    pub fn prepare(
        root: &Path,
        settings: Arc<Settings>,
        adapter: CompilerAdapter,
        log: RunLog,
    ) -> Result<Self, PipelineError> {
        let prepared = prepare_root(root, settings.watch.create_missing_root, &log)
            .and_then(|root| {
                let convention = adapter.convention().clone();
                let watcher =
                    DirectoryWatcher::start(&root, convention, settings.watch.event_capacity)?;
                Ok((root, watcher))
            });

        match prepared {
            Ok((root, watcher)) => Ok(Self {
                root,
                settings,
                adapter,
                watcher,
                log,
            }),
            Err(e) => {
                log.error(e.to_string());
                Err(e)
            }
        }
    }

    /// Absolute watch root of this run.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Running phase. Returns once stopped or failed; the log is closed by then.
    pub async fn run(self, mut control: mpsc::Receiver<PipelineCommand>) -> PipelineExit {
        let CompilePipeline {
            root,
            settings,
            adapter,
            watcher,
            log,
        } = self;

        let (mut debouncer, mut due_rx) = Debouncer::new(settings.watch.quiet_interval());
        let worker = CompileWorker::spawn(adapter.clone(), log.clone());
        let mut watcher = Some(watcher);
        let mut retry_available = true;

        log.info(format!(
            "Watching for SCSS/SASS file changes in: {}",
            root.display()
        ));

        let exit = loop {
            let Some(active) = watcher.as_mut() else {
                break PipelineExit::Failed(WatchError::ChannelClosed);
            };

            tokio::select! {
                command = control.recv() => {
                    // A dropped control sender means nobody can stop us later
                    match command {
                        Some(PipelineCommand::Stop) | None => break PipelineExit::Stopped,
                    }
                }

                Some(due) = due_rx.recv() => {
                    if debouncer.take_due(&due) && !worker.submit(due.path.clone()) {
                        crate::debug_event!("pipeline", "already queued", "{}", due.path.display());
                    }
                }

                event = active.next_event() => {
                    let error = match event {
                        Some(Ok(change)) => {
                            crate::debug_event!("pipeline", change.kind, "{}", change.path.display());
                            debouncer.observe(change);
                            continue;
                        }
                        Some(Err(e)) => e,
                        None => WatchError::ChannelClosed,
                    };

                    // Drop the broken subscription before deciding what to do
                    watcher = None;
                    if !retry_available {
                        log.error(format!("Watch failed for {}: {error}", root.display()));
                        break PipelineExit::Failed(error);
                    }
                    retry_available = false;
                    tracing::warn!(target: "pipeline", "watch error, retrying once: {error}");

                    tokio::select! {
                        _ = tokio::time::sleep(settings.watch.retry_backoff()) => {}
                        _ = control.recv() => break PipelineExit::Stopped,
                    }

                    match resubscribe(&root, &adapter, &settings) {
                        Ok(fresh) => {
                            crate::log_event!("watcher", "resubscribed", "{}", root.display());
                            watcher = Some(fresh);
                        }
                        Err(e) => {
                            log.error(format!("Watch failed for {}: {e}", root.display()));
                            break PipelineExit::Failed(e);
                        }
                    }
                }
            }
        };

        // Stopping: no new events, no pending timers, finish the in-flight compile
        drop(watcher);
        debouncer.cancel_all();
        drop(due_rx);
        worker.shutdown().await;

        log.info("Stopped");
        log.close();
        exit
    }
}

fn resubscribe(
    root: &Path,
    adapter: &CompilerAdapter,
    settings: &Settings,
) -> Result<DirectoryWatcher, WatchError> {
    if !root.is_dir() {
        return Err(WatchError::RootUnavailable {
            path: root.to_path_buf(),
        });
    }
    DirectoryWatcher::start(
        root,
        adapter.convention().clone(),
        settings.watch.event_capacity,
    )
}

/// Validate the watch root and return its absolute, canonical form.
fn prepare_root(
    root: &Path,
    create_missing: bool,
    log: &RunLog,
) -> Result<PathBuf, PipelineError> {
    if !root.exists() {
        if !create_missing {
            return Err(PipelineError::RootMissing {
                path: root.to_path_buf(),
            });
        }
        std::fs::create_dir_all(root).map_err(|e| PipelineError::CreateRoot {
            path: root.to_path_buf(),
            source: e,
        })?;
        log.info(format!("Created directory: {}", root.display()));
    }

    if !root.is_dir() {
        return Err(PipelineError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    // Also proves the directory is readable
    std::fs::read_dir(root).map_err(|e| PipelineError::Unreadable {
        path: root.to_path_buf(),
        source: e,
    })?;

    root.canonicalize().map_err(|e| PipelineError::Unreadable {
        path: root.to_path_buf(),
        source: e,
    })
}
