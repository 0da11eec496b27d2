//! Error types for the permissions module.

use taskshare_store::StoreError;
use thiserror::Error;

use crate::field::TaskField;

/// Errors that can occur during permission checks.
#[derive(Debug, Error)]
pub enum PermsError {
    /// Storage fault while looking up or updating a grant.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A permitted field carried a value it cannot take.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: TaskField, reason: String },
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
