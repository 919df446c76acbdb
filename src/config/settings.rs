//! TOML-based configuration for dm.
//!
//! Example configuration:
//! ```toml
//! [checks]
//! sample_size = 5     # offending values reported per failed check
//!
//! [flatten]
//! join = "left"       # default join kind for join_to_tbl / squash_to_tbl
//!
//! [sqlite]
//! path = "${DM_DATA_DIR}/nycflights.sqlite"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::provider::JoinKind;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Key and reference checks.
    pub checks: CheckSettings,

    /// Flattening defaults.
    pub flatten: FlattenSettings,

    /// SQLite provider.
    pub sqlite: SqliteSettings,
}

/// Key and reference check settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CheckSettings {
    /// Maximum number of offending values carried by a failed check.
    pub sample_size: usize,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self { sample_size: 5 }
    }
}

/// Flattening settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FlattenSettings {
    /// Join kind used when the caller does not pass one.
    pub join: JoinKind,
}

/// SQLite provider settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SqliteSettings {
    /// Database file (supports ${ENV_VAR} expansion). In-memory when absent.
    pub path: Option<String>,
}

impl SqliteSettings {
    /// The database path with environment variables expanded.
    pub fn resolved_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.path
            .as_deref()
            .map(|p| expand_env_vars(p).map(PathBuf::from))
            .transpose()
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `DM_CONFIG`
    /// 2. `./dm.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("DM_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("dm.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        Ok(Settings::default())
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.flatten.join == JoinKind::Nest {
            return Err(SettingsError::InvalidConfig(
                "flatten.join cannot be \"nest\"".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(&ch) = chars.peek() {
                if !(ch.is_alphanumeric() || ch == '_') {
                    break;
                }
                var_name.push(ch);
                chars.next();
            }
            if var_name.is_empty() {
                result.push('$');
                continue;
            }
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
