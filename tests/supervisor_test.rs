use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use sass_to_uss::compiler::CompileError;
use sass_to_uss::{
    CompilerAdapter, FileConvention, LogRecord, PipelineState, Settings, StyleCompiler,
    Supervisor, SupervisorError,
};
use tempfile::TempDir;

/// Outlasts the shutdown timeout used below.
struct Stuck {
    entered: Arc<AtomicBool>,
    hold: Duration,
}

impl StyleCompiler for Stuck {
    fn name(&self) -> &str {
        "stuck"
    }

    fn translate(&self, _source: &Path) -> Result<String, CompileError> {
        self.entered.store(true, Ordering::SeqCst);
        std::thread::sleep(self.hold);
        Ok("/* stale run */".to_string())
    }
}

/// Supervisor with a 100 ms shutdown timeout and a compiler stuck for `hold`.
fn stuck_supervisor(hold: Duration) -> (Supervisor, Arc<AtomicBool>) {
    let mut settings = Settings::default();
    settings.watch.debounce_ms = 20;
    settings.supervisor.shutdown_timeout_ms = 100;

    let entered = Arc::new(AtomicBool::new(false));
    let adapter = CompilerAdapter::new(
        Arc::new(Stuck {
            entered: Arc::clone(&entered),
            hold,
        }),
        FileConvention::default(),
    );
    (
        Supervisor::with_adapter(Arc::new(settings), adapter),
        entered,
    )
}

async fn wait_until_entered(entered: &AtomicBool) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while !entered.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("compile never started");
}

#[tokio::test]
async fn test_stop_times_out_and_cancels() {
    let temp_dir = TempDir::new().unwrap();
    let (supervisor, entered) = stuck_supervisor(Duration::from_secs(2));

    supervisor.start(temp_dir.path()).await.unwrap();
    let root = supervisor.watch_root().unwrap();
    let mut sub = supervisor.subscribe_log();

    std::fs::write(root.join("stuck.scss"), "a { b: c; }").unwrap();
    wait_until_entered(&entered).await;

    supervisor.stop().await;
    assert_eq!(supervisor.state(), PipelineState::Idle);

    let mut lines = Vec::new();
    while let Some(record) = sub.next().await {
        lines.push(record.to_line());
    }
    let n = lines.len();
    assert_eq!(
        lines[n - 2],
        "ERROR: Pipeline did not stop within 100 ms; cancelled"
    );
    assert_eq!(lines[n - 1], "Stopped");
    assert!(!lines.iter().any(|l| l.starts_with("Compiled: ")));

    // The supervisor is usable again right away
    supervisor.start(temp_dir.path()).await.unwrap();
    assert_eq!(supervisor.state(), PipelineState::Running);
    supervisor.stop().await;
}

#[tokio::test]
async fn test_cancelled_run_never_writes_output() {
    let temp_dir = TempDir::new().unwrap();
    let (supervisor, entered) = stuck_supervisor(Duration::from_millis(500));

    supervisor.start(temp_dir.path()).await.unwrap();
    let root = supervisor.watch_root().unwrap();

    std::fs::write(root.join("stale.scss"), "a { b: c; }").unwrap();
    wait_until_entered(&entered).await;

    supervisor.stop().await;
    assert_eq!(supervisor.state(), PipelineState::Idle);

    // Outlive the stuck compile; its result must be discarded
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert!(!root.join("stale.uss").exists());
}

#[tokio::test]
async fn test_second_subscriber_sees_full_history() {
    let temp_dir = TempDir::new().unwrap();
    let supervisor = Supervisor::new(Arc::new(Settings::default()));

    supervisor.start(temp_dir.path()).await.unwrap();
    let early = supervisor.subscribe_log();
    supervisor.stop().await;
    let late = supervisor.subscribe_log();

    let collect = |mut sub: sass_to_uss::LogSubscription| async move {
        let mut records: Vec<LogRecord> = Vec::new();
        while let Some(record) = sub.next().await {
            records.push(record);
        }
        records
    };

    let early = collect(early).await;
    let late = collect(late).await;
    assert_eq!(early, late);
    assert_eq!(early.last().unwrap().message, "Stopped");
}

#[tokio::test]
async fn test_missing_root_without_creation_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let mut settings = Settings::default();
    settings.watch.create_missing_root = false;
    let supervisor = Supervisor::new(Arc::new(settings));

    let missing = temp_dir.path().join("absent");
    let err = supervisor.start(&missing).await.unwrap_err();
    assert!(matches!(err, SupervisorError::Config(_)));
    assert_eq!(supervisor.state(), PipelineState::Idle);
    assert!(!missing.exists());
}
