//! Error types for the Orbitwell core

use thiserror::Error;

/// Result type alias for core operations
pub type CompanionResult<T> = Result<T, CompanionError>;

/// Errors raised by the companion engine.
///
/// Classification itself never fails: unknown sessions are provisioned and
/// unmatched text resolves to the fallback category. Errors come from input
/// policy and from load-time validation of the static assets.
#[derive(Error, Debug)]
pub enum CompanionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Category table error: {0}")]
    CategoryTable(String),

    #[error("Knowledge base error: {0}")]
    Knowledge(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for CompanionError {
    fn from(err: toml::de::Error) -> Self {
        CompanionError::CategoryTable(err.to_string())
    }
}

impl From<serde_json::Error> for CompanionError {
    fn from(err: serde_json::Error) -> Self {
        CompanionError::Knowledge(err.to_string())
    }
}
