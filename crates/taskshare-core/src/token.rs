//! Share tokens and the sources that mint them.
//!
//! A token is the only credential an anonymous caller has. It is 32 bytes
//! from the OS CSPRNG, hex-encoded, and carries nothing derivable: no
//! timestamps, counters, or ids.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Number of random bytes in a freshly minted token (256 bits).
pub const TOKEN_BYTES: usize = 32;

const MIN_TOKEN_LEN: usize = 8;
const MAX_TOKEN_LEN: usize = 128;

/// The public-facing credential for a grant.
///
/// `Debug` prints a fingerprint, never the token itself.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareToken(String);

impl ShareToken {
    /// Wrap a token string after checking its shape.
    ///
    /// Accepts 8..=128 characters of `[A-Za-z0-9_-]`. Callers treat a
    /// malformed token exactly like an unknown one.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let ok_len = (MIN_TOKEN_LEN..=MAX_TOKEN_LEN).contains(&s.len());
        let ok_chars = s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if ok_len && ok_chars {
            Ok(Self(s.to_string()))
        } else {
            Err(CoreError::InvalidToken)
        }
    }

    /// Encode raw random bytes as a token.
    pub fn from_random_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    /// The token string, for building links and storage lookups.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 16 hex chars of Blake3(token). Safe to log.
    pub fn fingerprint(&self) -> String {
        let hash = blake3::hash(self.0.as_bytes());
        hex::encode(&hash.as_bytes()[..8])
    }
}

impl fmt::Debug for ShareToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShareToken({})", self.fingerprint())
    }
}

/// A source of fresh share tokens.
pub trait TokenSource: Send + Sync {
    /// Mint a new token.
    ///
    /// Must fail rather than return a token from a weaker source.
    fn generate(&self) -> Result<ShareToken, CoreError>;
}

/// Tokens from the operating system's CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsTokenSource;

impl TokenSource for OsTokenSource {
    fn generate(&self) -> Result<ShareToken, CoreError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CoreError::EntropyUnavailable(e.to_string()))?;
        Ok(ShareToken::from_random_bytes(&bytes))
    }
}
