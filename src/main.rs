//! sass-to-uss command-line entry point.

mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use sass_to_uss::{Settings, logging};

use cli::{Cli, Commands, commands};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let mut settings = loaded.unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        eprintln!("Using default configuration.");
        Settings::default()
    });

    logging::init_with_config(&settings.logging);

    let result = match cli.into_command() {
        Commands::Init { force } => commands::init::run_init(force),
        Commands::Config => commands::init::run_config(&settings),
        Commands::Build { dir } => commands::build::run(&settings, &dir),
        Commands::Watch { dir, debounce_ms } => {
            if let Some(ms) = debounce_ms {
                settings.watch.debounce_ms = ms;
            }
            commands::watch::run(Arc::new(settings), dir).await
        }
        Commands::Host => commands::host::run(Arc::new(settings)).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
