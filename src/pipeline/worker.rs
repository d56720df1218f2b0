//! Serialized compile execution.
//!
//! All compiles of a run go through one worker task, so a path is never
//! compiled twice at once and log records come out in processing order.
//! Translation runs on the blocking pool; the output write happens back on
//! the worker task, so aborting the worker also drops a pending write.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::compiler::{CompileError, CompileOutcome, CompileResult, CompilerAdapter};
use crate::log_stream::RunLog;

/// Dropping the worker aborts its task.
pub(crate) struct CompileWorker {
    queue: mpsc::UnboundedSender<PathBuf>,
    /// Paths waiting in the queue and not started yet.
    queued: Arc<Mutex<HashSet<PathBuf>>>,
    accepting: CancellationToken,
    task: JoinHandle<()>,
}

impl CompileWorker {
    pub(crate) fn spawn(adapter: CompilerAdapter, log: RunLog) -> Self {
        let (queue, rx) = mpsc::unbounded_channel();
        let queued = Arc::new(Mutex::new(HashSet::new()));
        let accepting = CancellationToken::new();

        let task = tokio::spawn(work(
            rx,
            Arc::clone(&queued),
            accepting.clone(),
            adapter,
            log,
        ));

        Self {
            queue,
            queued,
            accepting,
            task,
        }
    }

    /// Queue a compile for `path`.
    ///
    /// Returns false if the path is already waiting; that queued compile will
    /// read the latest content anyway. A path that is currently compiling is
    /// queued again so the newer content gets its own compile.
    pub(crate) fn submit(&self, path: PathBuf) -> bool {
        if !self.queued.lock().insert(path.clone()) {
            return false;
        }
        if self.queue.send(path.clone()).is_err() {
            self.queued.lock().remove(&path);
            return false;
        }
        true
    }

    /// Stop accepting work, let an in-flight compile finish, drop the rest.
    pub(crate) async fn shutdown(mut self) {
        self.accepting.cancel();
        if let Err(e) = (&mut self.task).await {
            tracing::error!(target: "pipeline", "compile worker ended abnormally: {e}");
        }
    }
}

impl Drop for CompileWorker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn work(
    mut rx: mpsc::UnboundedReceiver<PathBuf>,
    queued: Arc<Mutex<HashSet<PathBuf>>>,
    accepting: CancellationToken,
    adapter: CompilerAdapter,
    log: RunLog,
) {
    loop {
        let source = tokio::select! {
            biased;
            _ = accepting.cancelled() => {
                crate::debug_event!("pipeline", "discarded queued compiles");
                break;
            }
            next = rx.recv() => match next {
                Some(source) => source,
                None => break,
            },
        };
        queued.lock().remove(&source);

        if !source.is_file() {
            // Deleted after its last change: nothing to compile, not an error
            crate::debug_event!("pipeline", "skipped, source gone", "{}", source.display());
            continue;
        }

        let job_adapter = adapter.clone();
        let job_source = source.clone();
        let compiled =
            tokio::task::spawn_blocking(move || job_adapter.compile(&job_source)).await;

        match compiled {
            Ok(result) => report(&log, &write_output(result)),
            Err(e) => log.error(format!("Compile task failed for {}: {e}", source.display())),
        }
    }
}

fn report(log: &RunLog, result: &CompileResult) {
    match &result.outcome {
        CompileOutcome::Success { .. } => {
            log.info(format!("Compiled: {}", result.output_path.display()));
        }
        CompileOutcome::Failure { detail } => log.error(detail.clone()),
    }
}

/// Compile `source` and write the output next to it. Blocking.
///
/// A failed write turns the result into a failure for that path.
pub fn compile_to_disk(adapter: &CompilerAdapter, source: &Path) -> CompileResult {
    write_output(adapter.compile(source))
}

/// Write a successful result next to its source.
fn write_output(result: CompileResult) -> CompileResult {
    let Some(bytes) = result.output_bytes() else {
        return result;
    };

    match write_atomically(&result.output_path, bytes) {
        Ok(()) => result,
        Err(e) => {
            let error = CompileError::Write {
                path: result.output_path.clone(),
                source: e,
            };
            CompileResult {
                outcome: CompileOutcome::Failure {
                    detail: error.to_string(),
                },
                ..result
            }
        }
    }
}

/// Replace `path` with `bytes` so readers never see a partial file.
fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
