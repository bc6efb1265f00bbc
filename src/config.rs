//! Configuration module for the retrieval service.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file (`.retriever/settings.toml`)
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `RETRIEVER_` and use double
//! underscores to separate nested levels:
//! - `RETRIEVER_STORE__DIMENSION=384` sets `store.dimension`
//! - `RETRIEVER_SEARCH__THRESHOLD=0.5` sets `search.threshold`
//! - `RETRIEVER_JOURNAL__ENABLED=true` sets `journal.enabled`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::vector::DEFAULT_DIMENSION;

/// Directory holding the settings file and, by default, the journal.
pub const CONFIG_DIR: &str = ".retriever";

/// Settings file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "settings.toml";

const ENV_PREFIX: &str = "RETRIEVER_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Global debug mode, forces the `debug` log level
    #[serde(default = "default_false")]
    pub debug: bool,

    /// Vector store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Search defaults and limits
    #[serde(default)]
    pub search: SearchConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Write-ahead journal settings
    #[serde(default)]
    pub journal: JournalConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StoreConfig {
    /// Embedding dimension, fixed for the lifetime of the store
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SearchConfig {
    /// Number of results when the caller does not ask for a specific count
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum similarity score when the caller does not provide one
    #[serde(default = "default_similarity_threshold")]
    pub threshold: f32,

    /// Largest `top_k` a caller may request
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// HTTP server bind address
    #[serde(default = "default_bind_address")]
    pub bind: String,

    /// Allow cross-origin requests from any origin
    #[serde(default = "default_true")]
    pub cors: bool,

    /// Largest request body accepted, in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct JournalConfig {
    /// Record accepted batches so the store survives restarts
    #[serde(default = "default_false")]
    pub enabled: bool,

    /// Directory holding the journal file
    #[serde(default = "default_journal_path")]
    pub path: PathBuf,

    /// Flush every batch to disk before acknowledging it
    #[serde(default = "default_true")]
    pub sync: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}
fn default_top_k() -> usize {
    5
}
fn default_similarity_threshold() -> f32 {
    0.7
}
fn default_max_top_k() -> usize {
    1000
}
fn default_bind_address() -> String {
    "127.0.0.1:8003".to_string()
}
fn default_max_body_bytes() -> usize {
    256 * 1024 * 1024
}
fn default_journal_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("journal")
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            debug: false,
            store: StoreConfig::default(),
            search: SearchConfig::default(),
            server: ServerConfig::default(),
            journal: JournalConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            threshold: default_similarity_threshold(),
            max_top_k: default_max_top_k(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
            cors: true,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_journal_path(),
            sync: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honoring environment overrides
    ///
    /// When the file lives in a `.retriever` directory, a relative
    /// `journal.path` is resolved against the directory containing it.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        let mut settings: Self = Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels, single underscore stays in field names
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)?;

        if let Some(root) = workspace_root(path.as_ref()) {
            settings.resolve_paths(root);
        }
        Ok(settings)
    }

    /// Anchors a relative `journal.path` at `root`.
    pub fn resolve_paths(&mut self, root: &Path) {
        if self.journal.path.is_relative() {
            self.journal.path = root.join(&self.journal.path);
        }
    }

    /// Find the settings file by looking for a `.retriever` directory
    /// from the current directory up to the root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        find_config_from(&current)
    }

    /// Check if configuration is properly initialized
    pub fn check_init() -> Result<(), String> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));
        check_config_file(&config_path)
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.store.dimension == 0 {
            return Err("store.dimension must be at least 1".to_string());
        }
        if self.search.top_k == 0 {
            return Err("search.top_k must be at least 1".to_string());
        }
        if self.search.top_k > self.search.max_top_k {
            return Err(format!(
                "search.top_k ({}) exceeds search.max_top_k ({})",
                self.search.top_k, self.search.max_top_k
            ));
        }
        if self.server.max_body_bytes == 0 {
            return Err("server.max_body_bytes must be at least 1".to_string());
        }
        if !self.search.threshold.is_finite() {
            return Err(format!(
                "search.threshold must be a finite number, got {}",
                self.search.threshold
            ));
        }
        Ok(())
    }

    /// Effective log filter directive: `debug` wins over `logging.level`.
    pub fn log_directive(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            &self.logging.level
        }
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file with helpful comments in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let current_dir = std::env::current_dir()?;
        Self::init_config_file_in(&current_dir, force)
    }

    /// Create a default settings file under `root/.retriever/`
    pub fn init_config_file_in(
        root: &Path,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = root.join(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&config_path, SETTINGS_TEMPLATE)?;
        Ok(config_path)
    }
}

fn find_config_from(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|ancestor| ancestor.join(CONFIG_DIR))
        .find(|dir| dir.is_dir())
        .map(|dir| dir.join(CONFIG_FILE))
}

/// Directory holding `.retriever` when `config_path` is `<root>/.retriever/<file>`.
fn workspace_root(config_path: &Path) -> Option<&Path> {
    let dir = config_path.parent()?;
    if dir.file_name()? == CONFIG_DIR {
        dir.parent()
    } else {
        None
    }
}

fn check_config_file(config_path: &Path) -> Result<(), String> {
    if !config_path.exists() {
        return Err("No configuration file found".to_string());
    }

    let content = std::fs::read_to_string(config_path)
        .map_err(|e| format!("Cannot read configuration file: {e}"))?;
    let settings = toml::from_str::<Settings>(&content).map_err(|e| {
        format!(
            "Invalid configuration file at {}: {e}\nRun 'retriever init --force' to regenerate",
            config_path.display()
        )
    })?;
    settings.validate()
}

const SETTINGS_TEMPLATE: &str = r#"# Retriever Configuration File

# Version of the configuration schema
version = 1

# Global debug mode (forces the debug log level)
debug = false

[store]
# Embedding dimension. Every ingested and queried vector must have exactly
# this many components. Cannot change once a journal exists.
dimension = 768

[search]
# Number of results returned when a request omits top_k
top_k = 5

# Minimum similarity score (0.0 to 1.0) when a request omits threshold.
# Scores are 1 / (1 + squared L2 distance).
threshold = 0.7

# Largest top_k a request may ask for
max_top_k = 1000

[server]
# HTTP server bind address
bind = "127.0.0.1:8003"

# Allow cross-origin requests from any origin
cors = true

# Largest request body accepted, in bytes (256 MiB). A 768-d document
# is roughly 15 KiB of JSON.
max_body_bytes = 268435456

[journal]
# Record every accepted batch so documents survive a restart.
# Disabled: the store starts empty on every launch.
enabled = false

# Directory holding batches.wal. Relative paths are resolved against the
# directory containing .retriever, wherever the command runs from.
path = ".retriever/journal"

# Flush each batch to disk before acknowledging it
sync = true

[logging]
# Filter directive used when RUST_LOG is not set
level = "info"

# "pretty" for humans, "json" for log collectors
format = "pretty"
"#;
