//! End-to-end runs against the real filesystem.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use sass_to_uss::compiler::CompileError;
use sass_to_uss::{
    CompilerAdapter, FileConvention, LogRecord, LogSubscription, PipelineState, Settings,
    StyleCompiler, Supervisor,
};
use tempfile::TempDir;

const WAIT: Duration = Duration::from_secs(10);

fn fast_settings() -> Arc<Settings> {
    let mut settings = Settings::default();
    settings.watch.debounce_ms = 50;
    Arc::new(settings)
}

/// Read the next record that matches, failing the test on timeout.
async fn wait_for(sub: &mut LogSubscription, pred: impl Fn(&LogRecord) -> bool) -> LogRecord {
    tokio::time::timeout(WAIT, async {
        loop {
            let record = sub.next().await.expect("log closed before match");
            if pred(&record) {
                return record;
            }
        }
    })
    .await
    .expect("timed out waiting for log record")
}

async fn drain(mut sub: LogSubscription) -> Vec<LogRecord> {
    let mut records = Vec::new();
    while let Some(record) = sub.next().await {
        records.push(record);
    }
    records
}

/// Echoes the source after a delay, counting how many translations started.
struct SlowEcho {
    delay: Duration,
    started: Arc<AtomicUsize>,
}

impl StyleCompiler for SlowEcho {
    fn name(&self) -> &str {
        "slow-echo"
    }

    fn translate(&self, source: &Path) -> Result<String, CompileError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let text = fs::read_to_string(source).map_err(|e| CompileError::Unreadable {
            path: source.to_path_buf(),
            source: e,
        })?;
        std::thread::sleep(self.delay);
        Ok(text)
    }
}

fn slow_supervisor(delay: Duration) -> (Supervisor, Arc<AtomicUsize>) {
    let started = Arc::new(AtomicUsize::new(0));
    let compiler = SlowEcho {
        delay,
        started: Arc::clone(&started),
    };
    let adapter = CompilerAdapter::new(Arc::new(compiler), FileConvention::default());
    (Supervisor::with_adapter(fast_settings(), adapter), started)
}

async fn wait_until_started(started: &AtomicUsize, count: usize) {
    tokio::time::timeout(WAIT, async {
        while started.load(Ordering::SeqCst) < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("compile never started");
}

#[tokio::test]
async fn test_save_produces_uss_next_to_source() {
    let temp_dir = TempDir::new().unwrap();
    let supervisor = Supervisor::new(fast_settings());
    supervisor.start(temp_dir.path().join("Styles")).await.unwrap();
    let root = supervisor.watch_root().unwrap();
    let mut sub = supervisor.subscribe_log();

    let nested = root.join("menus");
    fs::create_dir_all(&nested).unwrap();
    fs::write(
        nested.join("main.scss"),
        "$accent: #ff8800;\n.menu { .item { color: $accent; } }\n",
    )
    .unwrap();

    let expected = format!("Compiled: {}", nested.join("main.uss").display());
    wait_for(&mut sub, |r| r.to_line() == expected).await;

    let uss = fs::read_to_string(nested.join("main.uss")).unwrap();
    assert!(uss.contains(".menu .item"));
    assert!(uss.contains("#ff8800"));

    supervisor.stop().await;
    assert_eq!(supervisor.state(), PipelineState::Idle);
}

#[tokio::test]
async fn test_bad_file_does_not_stop_the_run() {
    let temp_dir = TempDir::new().unwrap();
    let supervisor = Supervisor::new(fast_settings());
    supervisor.start(temp_dir.path()).await.unwrap();
    let root = supervisor.watch_root().unwrap();
    let mut sub = supervisor.subscribe_log();

    fs::write(root.join("broken.scss"), ".a { color: red;").unwrap();
    let error = wait_for(&mut sub, |r| r.is_error()).await;
    assert!(error.to_line().starts_with("ERROR: "));
    assert!(error.message.contains("broken.scss"));
    assert!(!root.join("broken.uss").exists());

    fs::write(root.join("fine.scss"), ".b { margin: 0; }").unwrap();
    let expected = format!("Compiled: {}", root.join("fine.uss").display());
    wait_for(&mut sub, |r| r.to_line() == expected).await;
    assert_eq!(supervisor.state(), PipelineState::Running);

    supervisor.stop().await;
}

#[tokio::test]
async fn test_deleting_a_source_is_quiet() {
    let temp_dir = TempDir::new().unwrap();
    let supervisor = Supervisor::new(fast_settings());
    supervisor.start(temp_dir.path()).await.unwrap();
    let root = supervisor.watch_root().unwrap();
    let mut sub = supervisor.subscribe_log();

    let source = root.join("gone.scss");
    fs::write(&source, ".g { color: blue; }").unwrap();
    wait_for(&mut sub, |r| r.message.starts_with("Compiled: ")).await;

    fs::remove_file(&source).unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    supervisor.stop().await;

    let rest = drain(sub).await;
    assert!(rest.iter().all(|r| !r.is_error()), "unexpected error: {rest:?}");
    assert_eq!(rest.last().unwrap().message, "Stopped");
    // Output of a removed source is left alone
    assert!(root.join("gone.uss").exists());
}

#[tokio::test]
async fn test_ignores_non_source_files() {
    let temp_dir = TempDir::new().unwrap();
    let supervisor = Supervisor::new(fast_settings());
    supervisor.start(temp_dir.path()).await.unwrap();
    let root = supervisor.watch_root().unwrap();
    let sub = supervisor.subscribe_log();

    fs::write(root.join("readme.txt"), "not a stylesheet").unwrap();
    fs::write(root.join("plain.css"), "a { color: red; }").unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    supervisor.stop().await;

    let messages: Vec<_> = drain(sub).await.into_iter().map(|r| r.message).collect();
    assert!(messages.iter().all(|m| !m.starts_with("Compiled: ")));
    assert!(!root.join("plain.uss").exists());
}

#[tokio::test]
async fn test_save_during_compile_is_compiled_again() {
    let temp_dir = TempDir::new().unwrap();
    let (supervisor, started) = slow_supervisor(Duration::from_millis(400));
    supervisor.start(temp_dir.path()).await.unwrap();
    let root = supervisor.watch_root().unwrap();
    let mut sub = supervisor.subscribe_log();

    let source = root.join("panel.scss");
    fs::write(&source, "/* v1 */").unwrap();
    wait_until_started(&started, 1).await;

    // The first compile is still running
    fs::write(&source, "/* v2 */").unwrap();

    let expected = format!("Compiled: {}", root.join("panel.uss").display());
    wait_for(&mut sub, |r| r.to_line() == expected).await;
    wait_for(&mut sub, |r| r.to_line() == expected).await;

    assert!(started.load(Ordering::SeqCst) >= 2);
    let output = fs::read_to_string(root.join("panel.uss")).unwrap();
    assert_eq!(output, "/* v2 */");

    supervisor.stop().await;
}

#[tokio::test]
async fn test_stop_waits_for_in_flight_compile() {
    let temp_dir = TempDir::new().unwrap();
    let (supervisor, started) = slow_supervisor(Duration::from_millis(500));
    supervisor.start(temp_dir.path()).await.unwrap();
    let root = supervisor.watch_root().unwrap();
    let sub = supervisor.subscribe_log();

    fs::write(root.join("slow.scss"), "/* slow */").unwrap();
    wait_until_started(&started, 1).await;

    supervisor.stop().await;
    assert_eq!(supervisor.state(), PipelineState::Idle);

    let lines: Vec<_> = drain(sub).await.iter().map(LogRecord::to_line).collect();
    let n = lines.len();
    assert!(n >= 2);
    assert_eq!(
        lines[n - 2],
        format!("Compiled: {}", root.join("slow.uss").display())
    );
    assert_eq!(lines[n - 1], "Stopped");
    assert!(root.join("slow.uss").exists());
}

async fn wait_until_idle(supervisor: &Supervisor) {
    tokio::time::timeout(WAIT, async {
        while supervisor.state() != PipelineState::Idle {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("pipeline never returned to idle");
}

#[tokio::test]
async fn test_deleted_root_ends_the_run() {
    let temp_dir = TempDir::new().unwrap();
    let mut settings = Settings::default();
    settings.watch.debounce_ms = 50;
    settings.watch.retry_backoff_ms = 50;
    let supervisor = Supervisor::new(Arc::new(settings));

    supervisor.start(temp_dir.path().join("styles")).await.unwrap();
    let root = supervisor.watch_root().unwrap();
    let sub = supervisor.subscribe_log();

    fs::remove_dir_all(&root).unwrap();

    let lines: Vec<_> = tokio::time::timeout(WAIT, drain(sub))
        .await
        .expect("run did not end after its root was deleted")
        .iter()
        .map(LogRecord::to_line)
        .collect();

    let errors: Vec<_> = lines.iter().filter(|l| l.starts_with("ERROR: ")).collect();
    assert_eq!(errors.len(), 1, "expected exactly one error: {lines:?}");

    let n = lines.len();
    assert!(
        lines[n - 2].starts_with(&format!("ERROR: Watch failed for {}: ", root.display())),
        "unexpected log: {lines:?}"
    );
    assert_eq!(lines[n - 1], "Stopped");

    // Ended on its own: no stop() needed to get back to idle
    wait_until_idle(&supervisor).await;
    supervisor.start(temp_dir.path()).await.unwrap();
    assert_eq!(supervisor.state(), PipelineState::Running);
    supervisor.stop().await;
}

#[tokio::test]
async fn test_stop_during_retry_backoff_is_clean() {
    let temp_dir = TempDir::new().unwrap();
    let mut settings = Settings::default();
    settings.watch.retry_backoff_ms = 30_000;
    let supervisor = Supervisor::new(Arc::new(settings));

    supervisor.start(temp_dir.path().join("styles")).await.unwrap();
    let root = supervisor.watch_root().unwrap();
    let sub = supervisor.subscribe_log();

    fs::remove_dir_all(&root).unwrap();
    // Give the watch error time to arrive and the backoff to begin
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(supervisor.state(), PipelineState::Running);

    tokio::time::timeout(Duration::from_secs(5), supervisor.stop())
        .await
        .expect("stop waited for the retry backoff");
    assert_eq!(supervisor.state(), PipelineState::Idle);

    let records = drain(sub).await;
    assert!(records.iter().all(|r| !r.is_error()), "unexpected error: {records:?}");
    assert_eq!(records.last().unwrap().message, "Stopped");
}
