//! Configuration module for dm.
//!
//! Handles the TOML settings file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, CheckSettings, FlattenSettings, Settings, SettingsError, SqliteSettings,
};
