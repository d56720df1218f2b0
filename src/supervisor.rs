//! Lifecycle control of the compile pipeline for a host application.
//!
//! The supervisor owns the [`PipelineState`] and a handle to the running
//! pipeline task. Commands go to the pipeline over a control channel; log
//! records come back through the run's [`RunLog`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::compiler::CompilerAdapter;
use crate::config::Settings;
use crate::log_stream::{LogSubscription, RunLog};
use crate::pipeline::{CompilePipeline, PipelineCommand, PipelineError, PipelineExit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    Stopping,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Running => f.write_str("running"),
            Self::Stopping => f.write_str("stopping"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Pipeline is already running")]
    AlreadyRunning,

    #[error(transparent)]
    Config(#[from] PipelineError),
}

/// State visible without waiting on a lifecycle transition.
#[derive(Debug)]
struct Shared {
    state: PipelineState,
    /// Increments per started run so a finished old run cannot touch a new one.
    run_id: u64,
    root: Option<PathBuf>,
    log: RunLog,
}

#[derive(Debug)]
struct ActiveRun {
    control: mpsc::Sender<PipelineCommand>,
    task: JoinHandle<PipelineExit>,
    log: RunLog,
}

/// Start/stop control over a single pipeline instance.
#[derive(Debug)]
pub struct Supervisor {
    settings: Arc<Settings>,
    adapter: CompilerAdapter,
    shared: Arc<Mutex<Shared>>,
    /// Held across a whole start or stop so transitions never interleave.
    run: tokio::sync::Mutex<Option<ActiveRun>>,
}

impl Supervisor {
    pub fn new(settings: Arc<Settings>) -> Self {
        let adapter = CompilerAdapter::from_settings(&settings);
        Self::with_adapter(settings, adapter)
    }

    /// Supervisor compiling through a custom adapter.
    pub fn with_adapter(settings: Arc<Settings>, adapter: CompilerAdapter) -> Self {
        let log = RunLog::new();
        log.close();

        Self {
            settings,
            adapter,
            shared: Arc::new(Mutex::new(Shared {
                state: PipelineState::Idle,
                run_id: 0,
                root: None,
                log,
            })),
            run: tokio::sync::Mutex::new(None),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.shared.lock().state
    }

    /// Watch root of the current (or last) run.
    pub fn watch_root(&self) -> Option<PathBuf> {
        self.shared.lock().root.clone()
    }

    /// Records of the current (or last) run: everything so far, then live
    /// records until that run stops.
    pub fn subscribe_log(&self) -> LogSubscription {
        self.shared.lock().log.subscribe()
    }

    /// Start watching `root`. Returns as soon as the pipeline runs in the background.
    ///
    /// A bad watch root is logged in the new run's log and returned as
    /// [`SupervisorError::Config`]; the state stays idle.
    pub async fn start(&self, root: impl AsRef<Path>) -> Result<(), SupervisorError> {
        let mut run = self.run.lock().await;

        if self.state() != PipelineState::Idle {
            return Err(SupervisorError::AlreadyRunning);
        }
        // A run that ended on its own leaves a finished handle behind
        run.take();

        let root = root.as_ref();
        let log = RunLog::new();
        let run_id = {
            let mut shared = self.shared.lock();
            shared.run_id += 1;
            shared.root = Some(root.to_path_buf());
            shared.log = log.clone();
            shared.run_id
        };

        let prepared = CompilePipeline::prepare(
            root,
            Arc::clone(&self.settings),
            self.adapter.clone(),
            log.clone(),
        );
        let pipeline = match prepared {
            Ok(pipeline) => pipeline,
            Err(e) => {
                log.close();
                return Err(e.into());
            }
        };

        let (control, control_rx) = mpsc::channel(1);
        {
            let mut shared = self.shared.lock();
            shared.state = PipelineState::Running;
            shared.root = Some(pipeline.root().to_path_buf());
        }
        crate::log_event!("supervisor", "started", "{}", pipeline.root().display());

        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move {
            let exit = pipeline.run(control_rx).await;
            let mut shared = shared.lock();
            if shared.run_id == run_id {
                shared.state = PipelineState::Idle;
            }
            exit
        });

        *run = Some(ActiveRun { control, task, log });
        Ok(())
    }

    /// Stop the running pipeline and wait for it, bounded by the shutdown timeout.
    ///
    /// No-op when idle. If the pipeline does not finish in time its task is
    /// cancelled and the state is reset anyway.
    pub async fn stop(&self) {
        let mut run = self.run.lock().await;
        let Some(active) = run.take() else {
            return;
        };

        if !active.task.is_finished() {
            self.shared.lock().state = PipelineState::Stopping;
            // Full channel or closed receiver both mean the pipeline is already stopping
            let _ = active.control.try_send(PipelineCommand::Stop);
        }

        let timeout = self.settings.supervisor.shutdown_timeout();
        let mut task = active.task;
        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(exit)) => {
                crate::debug_event!("supervisor", "pipeline exited", "{exit:?}");
            }
            Ok(Err(e)) => {
                active.log.error(format!("Pipeline task failed: {e}"));
                active.log.info("Stopped");
                active.log.close();
            }
            Err(_) => {
                task.abort();
                // Wait for the cancellation to land so the task cannot outlive this stop
                let _ = task.await;
                active.log.error(format!(
                    "Pipeline did not stop within {} ms; cancelled",
                    timeout.as_millis()
                ));
                active.log.info("Stopped");
                active.log.close();
            }
        }

        self.shared.lock().state = PipelineState::Idle;
        crate::log_event!("supervisor", "stopped");
    }
}
