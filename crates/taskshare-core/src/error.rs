//! Error types for Taskshare Core.

use thiserror::Error;

/// Errors from core primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The OS random source could not be read. Token minting must stop here;
    /// there is no weaker fallback.
    #[error("entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("invalid permission tier: {0:?}")]
    InvalidTier(String),

    #[error("malformed share token")]
    InvalidToken,
}
