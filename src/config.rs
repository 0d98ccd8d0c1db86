//! Configuration management for Trellis.
//!
//! Loads the optional TOML configuration file. Every field has a default,
//! so a missing file is the same as an empty one.

use crate::error::{Result, TrellisError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the application directory under the platform config dir.
const APP_DIR: &str = "db-trellis";

/// Main configuration structure for Trellis.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Where the connection list and encryption key live.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Query preview and formatting settings.
    #[serde(default)]
    pub query: QueryConfig,
}

/// File locations for persisted state.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StorageConfig {
    /// Connection list file (JSON).
    pub connections_file: Option<PathBuf>,

    /// Key file holding the field-encryption key (dotenv format).
    pub key_file: Option<PathBuf>,
}

impl StorageConfig {
    /// Returns the connection list path, falling back to the config dir.
    pub fn connections_path(&self) -> PathBuf {
        self.connections_file
            .clone()
            .unwrap_or_else(|| app_dir().join("connections.json"))
    }

    /// Returns the key file path, falling back to the config dir.
    pub fn key_path(&self) -> PathBuf {
        self.key_file.clone().unwrap_or_else(|| app_dir().join(".env"))
    }
}

/// Query preview and formatting settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryConfig {
    /// Rows fetched by a table or view preview.
    #[serde(default = "default_preview_limit")]
    pub preview_limit: u32,

    /// Spaces per indentation level used by the SQL formatter.
    #[serde(default = "default_indent")]
    pub indent: u8,
}

fn default_preview_limit() -> u32 {
    10
}

fn default_indent() -> u8 {
    2
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            preview_limit: default_preview_limit(),
            indent: default_indent(),
        }
    }
}

fn app_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        app_dir().join("config.toml")
    }

    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| TrellisError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Loads `path` if given, otherwise the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Self::load_from_file(&Self::default_path()),
        }
    }

    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            TrellisError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }
}
