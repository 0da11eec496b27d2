//! Error types for the sharing service.

use taskshare_perms::PermsError;
use taskshare_store::StoreError;
use thiserror::Error;

/// Errors that can occur during sharing operations.
///
/// Denials (unknown token, expired, revoked, forbidden, rejected fields)
/// are not errors; they are returned as outcome enums.
#[derive(Debug, Error)]
pub enum ShareError {
    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Permission check or value validation error.
    #[error("permission error: {0}")]
    Perms(#[from] PermsError),

    /// The request itself is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A task store or notifier failed.
    #[error("collaborator failure: {0}")]
    Collaborator(#[from] anyhow::Error),
}

impl ShareError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ShareError::InvalidRequest(_) => 400,
            ShareError::Perms(PermsError::InvalidValue { .. }) => 400,
            _ => 500,
        }
    }

    /// Message safe to return to the caller. Faults carry no detail.
    pub fn public_message(&self) -> String {
        match self {
            ShareError::InvalidRequest(reason) => reason.clone(),
            ShareError::Perms(err @ PermsError::InvalidValue { .. }) => err.to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

/// Result type for sharing operations.
pub type Result<T> = std::result::Result<T, ShareError>;
