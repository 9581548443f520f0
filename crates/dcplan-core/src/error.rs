//! Error types for loading catalogs, specifications and configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while loading planner inputs.
///
/// Individual malformed rows are never errors; they are dropped and
/// recorded in a [`LoadReport`](crate::LoadReport).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}: expected a JSON array of rows")]
    NotAnArray { path: PathBuf },

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid config: {field} {message}")]
    InvalidConfig { field: &'static str, message: String },

    #[error("failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

impl CoreError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        CoreError::InvalidConfig {
            field,
            message: message.into(),
        }
    }
}
