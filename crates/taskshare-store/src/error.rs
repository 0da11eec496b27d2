//! Error types for the store module.

use taskshare_core::CoreError;
use thiserror::Error;

/// Errors that can occur during store operations.
///
/// These are faults. Expected outcomes such as "token not found" or
/// "requester is not the owner" are return values, not errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// Token minting failed (entropy source unavailable).
    #[error("token generation failed: {0}")]
    Token(#[from] CoreError),

    /// Every minted token collided with an existing one.
    #[error("could not mint a unique share token after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A lock guarding store state was poisoned by a panicking writer.
    #[error("store lock poisoned: {0}")]
    Poisoned(String),

    /// A blocking storage task could not be joined.
    #[error("storage task failed: {0}")]
    Join(String),
}

impl From<rusqlite::Error> for StoreError {
    /// Rows that cannot be decoded are corrupt data, not database failures.
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::IntegralValueOutOfRange(column, value) => {
                StoreError::InvalidData(format!("column {} out of range: {}", column, value))
            }
            rusqlite::Error::FromSqlConversionFailure(column, _, source) => {
                StoreError::InvalidData(format!("column {}: {}", column, source))
            }
            other => StoreError::Database(other),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
