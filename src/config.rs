//! Configuration module for the SASS to USS watcher.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `SASS_TO_USS_` and use double
//! underscores to separate nested levels:
//! - `SASS_TO_USS_WATCH__DEBOUNCE_MS=300` sets `watch.debounce_ms`
//! - `SASS_TO_USS_COMPILER__STYLE=compressed` sets `compiler.style`
//! - `SASS_TO_USS_SUPERVISOR__SHUTDOWN_TIMEOUT_MS=1000` sets `supervisor.shutdown_timeout_ms`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::convention::FileConvention;

/// Directory holding the settings file, searched from the current directory upwards.
pub const CONFIG_DIR: &str = ".sass-to-uss";

/// Settings file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "settings.toml";

const ENV_PREFIX: &str = "SASS_TO_USS_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Watch and debounce behavior
    #[serde(default)]
    pub watch: WatchConfig,

    /// Stylesheet compiler options
    #[serde(default)]
    pub compiler: CompilerConfig,

    /// Pipeline lifecycle management
    #[serde(default)]
    pub supervisor: SupervisorConfig,

    /// Diagnostic logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatchConfig {
    /// Quiet interval before a changed file is compiled
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Recognized source extensions (case-insensitive, without the dot)
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,

    /// Extension given to compiled output files
    #[serde(default = "default_output_extension")]
    pub output_extension: String,

    /// Create the watch root when it does not exist yet
    #[serde(default = "default_true")]
    pub create_missing_root: bool,

    /// Delay before the single re-subscription attempt after a watch failure
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Capacity of the filesystem event channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

/// Output formatting of compiled stylesheets.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    #[default]
    Expanded,
    Compressed,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct CompilerConfig {
    #[serde(default)]
    pub style: OutputStyle,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SupervisorConfig {
    /// How long `stop` waits for the pipeline before cancelling it
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level for all targets (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides, e.g. `pipeline = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
fn default_debounce_ms() -> u64 {
    200
}
fn default_source_extensions() -> Vec<String> {
    vec!["scss".to_string(), "sass".to_string()]
}
fn default_output_extension() -> String {
    "uss".to_string()
}
fn default_retry_backoff_ms() -> u64 {
    500
}
fn default_event_capacity() -> usize {
    256
}
fn default_shutdown_timeout_ms() -> u64 {
    5_000
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            watch: WatchConfig::default(),
            compiler: CompilerConfig::default(),
            supervisor: SupervisorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            source_extensions: default_source_extensions(),
            output_extension: default_output_extension(),
            create_missing_root: true,
            retry_backoff_ms: default_retry_backoff_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl WatchConfig {
    pub fn quiet_interval(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// File naming convention described by this section.
    pub fn convention(&self) -> FileConvention {
        FileConvention::new(&self.source_extensions, &self.output_extension)
    }
}

impl SupervisorConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels, single underscore stays in names
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find the settings file by looking for the config directory
    /// from the current directory up to the filesystem root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR);
            if config_dir.is_dir() {
                return Some(config_dir.join(CONFIG_FILE));
            }
        }

        None
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.watch.debounce_ms, 200);
        assert_eq!(settings.watch.source_extensions, vec!["scss", "sass"]);
        assert_eq!(settings.watch.output_extension, "uss");
        assert!(settings.watch.create_missing_root);
        assert_eq!(settings.compiler.style, OutputStyle::Expanded);
        assert_eq!(settings.supervisor.shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(settings.logging.default, "warn");
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
version = 2

[watch]
debounce_ms = 50
output_extension = "css"

[compiler]
style = "compressed"

[supervisor]
shutdown_timeout_ms = 250

[logging.modules]
pipeline = "debug"
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.version, 2);
        assert_eq!(settings.watch.quiet_interval(), Duration::from_millis(50));
        assert_eq!(settings.watch.output_extension, "css");
        // Unspecified values keep their defaults
        assert_eq!(settings.watch.source_extensions.len(), 2);
        assert_eq!(settings.compiler.style, OutputStyle::Compressed);
        assert_eq!(settings.supervisor.shutdown_timeout_ms, 250);
        assert_eq!(settings.logging.modules["pipeline"], "debug");
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.watch.debounce_ms = 75;
        settings.compiler.style = OutputStyle::Compressed;

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.watch.debounce_ms, 75);
        assert_eq!(loaded.compiler.style, OutputStyle::Compressed);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from(temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings.watch, WatchConfig::default());
    }

    #[test]
    fn test_convention_from_watch_config() {
        let config = WatchConfig::default();
        let convention = config.convention();
        assert!(convention.is_source(Path::new("a.SCSS")));
        assert_eq!(
            convention.output_path(Path::new("styles/a.sass")),
            PathBuf::from("styles/a.uss")
        );
    }
}
