//! Error types for the object model

use crate::item::{ItemRef, ItemType};
use cobbler_config::ConfigError;
use thiserror::Error;

/// Object model errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid value for field '{name}': {reason}")]
    InvalidField { name: String, reason: String },

    #[error("{kind} not found: {name}")]
    NotFound { kind: ItemType, name: String },

    #[error("{kind} '{name}' has dependents: {}", dependents.join(", "))]
    HasDependents {
        kind: ItemType,
        name: String,
        dependents: Vec<String>,
    },

    #[error("{parent} references missing child {child}")]
    DanglingChild { parent: ItemRef, child: ItemRef },

    #[error("'{0}' cannot be its own parent")]
    SelfParent(String),

    #[error("Setting the parent of {item} to {parent} would create a cycle")]
    Cycle { item: ItemRef, parent: ItemRef },

    #[error("{kind} already exists: {name}")]
    AlreadyExists { kind: ItemType, name: String },

    #[error("{field} '{value}' is already used by system '{owner}'")]
    DuplicateNetInfo {
        field: String,
        value: String,
        owner: String,
    },

    #[error("{kind} '{name}' is not valid: {reason}")]
    Invalid {
        kind: ItemType,
        name: String,
        reason: String,
    },

    #[error("Unknown object type: {0}")]
    UnknownType(String),

    #[error("Empty search criteria")]
    EmptySearch,

    #[error("Settings error: {0}")]
    Config(#[from] ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for [`Error::InvalidField`]
    pub fn invalid_field(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidField {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for object model operations
pub type Result<T> = std::result::Result<T, Error>;
