use crate::core::{DalError, Result};
use crate::core::db::DEFAULT_TABLE_OPTIONS;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub schema: SchemaConfig,
}

/// Connection settings applied by `core::db::connect`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`
    pub path: String,
    pub foreign_keys: bool,
    /// Requested journal mode; left untouched when absent
    pub journal_mode: Option<String>,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: ":memory:".to_string(),
            foreign_keys: true,
            journal_mode: None,
            busy_timeout_ms: 5000,
        }
    }
}

/// DDL generation settings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Options clause appended to CREATE TABLE when the caller passes none
    pub table_options: Option<String>,
}

impl SchemaConfig {
    pub fn table_options(&self) -> &str {
        self.table_options.as_deref().unwrap_or(DEFAULT_TABLE_OPTIONS)
    }
}

/// Parses configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).map_err(|e| DalError::Config(e.to_string()))
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// let config = crudlayer::config::load_config("config.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// `<config dir>/crudlayer/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("crudlayer").join("config.toml"))
}
