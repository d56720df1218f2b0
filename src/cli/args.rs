//! CLI argument parsing using clap.
//!
//! Contains the Cli struct and the Commands enum.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// SCSS/SASS to USS watcher
#[derive(Parser, Debug)]
#[command(
    name = "sass-to-uss",
    version = env!("CARGO_PKG_VERSION"),
    about = "Compile SCSS/SASS to USS whenever a source file changes",
    long_about = "Watches a directory recursively and compiles every changed .scss/.sass \
                  file to a .uss file next to it.",
    next_line_help = true,
    styles = clap_cargo_style(),
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory to watch when no command is given (defaults to the current directory)
    #[arg(value_name = "DIR")]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// The command to run; a bare `sass-to-uss [DIR]` means `watch [DIR]`.
    pub fn into_command(self) -> Commands {
        match self.command {
            Some(command) => command,
            None => Commands::Watch {
                dir: self.dir.unwrap_or_else(|| PathBuf::from(".")),
                debounce_ms: None,
            },
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Watch a directory and compile changed sources until Ctrl-C
    #[command(about = "Watch a directory and compile changed sources")]
    Watch {
        /// Directory to watch (created if missing)
        #[arg(value_name = "DIR", default_value = ".")]
        dir: PathBuf,

        /// Quiet interval in milliseconds (overrides config)
        #[arg(long)]
        debounce_ms: Option<u64>,
    },

    /// Compile every source under a directory once
    #[command(about = "Compile every source under a directory once")]
    Build {
        #[arg(value_name = "DIR", default_value = ".")]
        dir: PathBuf,
    },

    /// Line protocol for host applications on stdin/stdout
    #[command(
        about = "Accept start/stop/status/quit on stdin, stream log lines on stdout"
    )]
    Host,

    /// Initialize project
    #[command(about = "Create .sass-to-uss/settings.toml with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration
    #[command(about = "Display active settings")]
    Config,
}
