//! Init and Config commands.

use std::path::PathBuf;
use std::process::ExitCode;

use sass_to_uss::Settings;
use sass_to_uss::config::{CONFIG_DIR, CONFIG_FILE};

/// Run init command - create configuration file.
pub fn run_init(force: bool) -> anyhow::Result<ExitCode> {
    let config_path = PathBuf::from(CONFIG_DIR).join(CONFIG_FILE);

    if config_path.exists() && !force {
        eprintln!(
            "Configuration file already exists at: {}",
            config_path.display()
        );
        eprintln!("Use --force to overwrite");
        return Ok(ExitCode::FAILURE);
    }

    let path = Settings::init_config_file(force)
        .map_err(|e| anyhow::anyhow!("failed to write configuration: {e}"))?;
    println!("Created configuration file at: {}", path.display());
    println!("Edit this file to customize your settings.");
    Ok(ExitCode::SUCCESS)
}

/// Run config command - display current configuration.
pub fn run_config(config: &Settings) -> anyhow::Result<ExitCode> {
    println!("Current Configuration:");
    println!("{}", "=".repeat(50));
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(ExitCode::SUCCESS)
}
