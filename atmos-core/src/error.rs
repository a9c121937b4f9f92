//! Error types for the ATMOS core library.
//!
//! Most operations in the core never fail: numeric inputs are clamped and
//! missing records are reported as `None`. Errors only surface from
//! configuration loading and persistence.

use thiserror::Error;

/// Top-level error type for all ATMOS operations that can fail.
#[derive(Error, Debug)]
pub enum AtmosError {
    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error (invalid TOML, inconsistent tables).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for AtmosError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, AtmosError>;
