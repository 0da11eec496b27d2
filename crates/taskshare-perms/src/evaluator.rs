//! Access evaluation for anonymous token holders.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use taskshare_core::{Grant, PermissionTier, ShareToken, Timestamp};
use taskshare_store::Store;

use crate::error::Result;

/// Why a token did not open its resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// No grant carries this token, or the token is malformed.
    NotFound,
    /// The grant was revoked. Wins over expiry.
    Revoked,
    /// The grant's expiry has passed.
    Expired,
}

impl DenyReason {
    /// HTTP status for this denial.
    pub fn status_code(&self) -> u16 {
        match self {
            DenyReason::NotFound => 404,
            DenyReason::Expired => 410,
            DenyReason::Revoked => 403,
        }
    }

    /// Message safe to show an anonymous caller.
    pub fn public_message(&self) -> &'static str {
        match self {
            DenyReason::NotFound => "Invalid share link",
            DenyReason::Expired => "This share link has expired",
            DenyReason::Revoked => "This share link has been revoked",
        }
    }
}

/// Result of evaluating a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// The token is valid. `grant` reflects the access just recorded.
    Allow { grant: Grant, tier: PermissionTier },
    NotFound,
    Revoked,
    Expired,
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow { .. })
    }

    /// The denial reason, or `None` for `Allow`.
    pub fn reason(&self) -> Option<DenyReason> {
        match self {
            AccessDecision::Allow { .. } => None,
            AccessDecision::NotFound => Some(DenyReason::NotFound),
            AccessDecision::Revoked => Some(DenyReason::Revoked),
            AccessDecision::Expired => Some(DenyReason::Expired),
        }
    }
}

impl From<DenyReason> for AccessDecision {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::NotFound => AccessDecision::NotFound,
            DenyReason::Revoked => AccessDecision::Revoked,
            DenyReason::Expired => AccessDecision::Expired,
        }
    }
}

/// Decides whether a presented token opens its resource.
///
/// Not a pure query: every `Allow` increments the grant's access count and
/// stamps `last_accessed_at`. Denials write nothing.
pub struct AccessEvaluator<S: Store + ?Sized> {
    store: Arc<S>,
}

impl<S: Store + ?Sized> Clone for AccessEvaluator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store + ?Sized> AccessEvaluator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Evaluate `token` at server time `now`.
    ///
    /// Checks run in a fixed order: lookup, then revocation, then expiry.
    /// A grant revoked between the lookup and the access write is reported
    /// as `Revoked` and its count is left alone.
    pub async fn evaluate(&self, token: &ShareToken, now: Timestamp) -> Result<AccessDecision> {
        let fingerprint = token.fingerprint();

        let Some(grant) = self.store.find_by_token(token).await? else {
            debug!(token = %fingerprint, "token not found");
            return Ok(AccessDecision::NotFound);
        };

        if grant.revoked {
            debug!(token = %fingerprint, grant_id = %grant.grant_id, "token revoked");
            return Ok(AccessDecision::Revoked);
        }

        if grant.is_expired(now) {
            debug!(
                token = %fingerprint,
                grant_id = %grant.grant_id,
                expires_at = ?grant.expires_at,
                "token expired"
            );
            return Ok(AccessDecision::Expired);
        }

        match self.store.record_access(grant.grant_id, now).await? {
            Some(updated) => {
                debug!(
                    token = %fingerprint,
                    grant_id = %updated.grant_id,
                    tier = %updated.tier,
                    access_count = updated.access_count,
                    "access allowed"
                );
                let tier = updated.tier;
                Ok(AccessDecision::Allow {
                    grant: updated,
                    tier,
                })
            }
            None => {
                warn!(
                    token = %fingerprint,
                    grant_id = %grant.grant_id,
                    "grant revoked during evaluation"
                );
                Ok(AccessDecision::Revoked)
            }
        }
    }

    /// Evaluate a raw token string from a request path.
    ///
    /// Malformed input is indistinguishable from an unknown token.
    pub async fn evaluate_str(&self, raw: &str, now: Timestamp) -> Result<AccessDecision> {
        match ShareToken::parse(raw) {
            Ok(token) => self.evaluate(&token, now).await,
            Err(_) => {
                debug!("malformed token");
                Ok(AccessDecision::NotFound)
            }
        }
    }
}
