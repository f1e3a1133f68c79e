//! Error types for chatgate-core

use crate::keys::KeyError;
use crate::quota::StoreError;
use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Quota store failure
    #[error("quota store error: {0}")]
    Store(#[from] StoreError),

    /// Key directory failure
    #[error("key directory error: {0}")]
    Key(#[from] KeyError),

    /// SQLite failure
    #[error("database error: {0}")]
    Database(String),

    /// Invalid settings
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error (serialization, filesystem, etc.)
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
