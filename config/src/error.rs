//! Error types for settings operations

use std::path::PathBuf;
use thiserror::Error;

/// Settings errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid settings: {0}")]
    Invalid(String),

    #[error("Settings not found: {0}")]
    NotFound(PathBuf),
}

/// Result type alias for settings operations
pub type Result<T> = std::result::Result<T, ConfigError>;
