//! Line protocol for a host application.
//!
//! Commands arrive one per line on stdin:
//!
//! ```text
//! start [DIR]   start watching DIR (default: current directory)
//! stop          stop the running pipeline
//! status        print "STATUS: idle|running|stopping"
//! quit          stop and exit (also on end of input)
//! ```
//!
//! Every log record of every run is written to stdout as one line, errors
//! prefixed with `ERROR: `.

use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use sass_to_uss::{LogSubscription, Settings, Supervisor, SupervisorError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    Start(Option<PathBuf>),
    Stop,
    Status,
    Quit,
}

impl FromStr for HostCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match (verb.to_ascii_lowercase().as_str(), rest) {
            ("start", "") => Ok(Self::Start(None)),
            ("start", dir) => {
                let dir = dir.trim_matches('"');
                Ok(Self::Start(Some(PathBuf::from(dir))))
            }
            ("stop", "") => Ok(Self::Stop),
            ("status", "") => Ok(Self::Status),
            ("quit" | "exit", "") => Ok(Self::Quit),
            ("", _) => Err("empty command".to_string()),
            _ => Err(format!("Unknown command: {line}")),
        }
    }
}

/// Serve the protocol until `quit` or end of input.
pub async fn run(settings: Arc<Settings>) -> anyhow::Result<ExitCode> {
    let supervisor = Supervisor::new(settings);

    // One writer keeps lines from different runs whole
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = out_rx.recv().await {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    let mut forwarders: Vec<JoinHandle<()>> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<HostCommand>() {
            Ok(HostCommand::Start(dir)) => {
                let dir = dir.unwrap_or_else(|| PathBuf::from("."));
                match supervisor.start(&dir).await {
                    // A rejected root is reported through the run's own log
                    Ok(()) | Err(SupervisorError::Config(_)) => {
                        let log = supervisor.subscribe_log();
                        forwarders.push(forward(log, out_tx.clone()));
                    }
                    Err(e @ SupervisorError::AlreadyRunning) => {
                        let _ = out_tx.send(format!("ERROR: {e}"));
                    }
                }
            }
            Ok(HostCommand::Stop) => supervisor.stop().await,
            Ok(HostCommand::Status) => {
                let _ = out_tx.send(format!("STATUS: {}", supervisor.state()));
            }
            Ok(HostCommand::Quit) => break,
            Err(e) => {
                let _ = out_tx.send(format!("ERROR: {e}"));
            }
        }

        forwarders.retain(|f| !f.is_finished());
    }

    supervisor.stop().await;
    for forwarder in forwarders {
        let _ = forwarder.await;
    }

    drop(out_tx);
    writer
        .await
        .context("stdout writer failed")?
        .context("failed to write stdout")?;

    Ok(ExitCode::SUCCESS)
}

fn forward(mut log: LogSubscription, out: mpsc::UnboundedSender<String>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(record) = log.next().await {
            if out.send(record.to_line()).is_err() {
                break;
            }
        }
    })
}
