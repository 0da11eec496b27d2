//! Store trait: the abstract interface for grant persistence.
//!
//! This trait allows the sharing service to be storage-agnostic.
//! Implementations include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use taskshare_core::{
    Grant, GrantId, GrantSpec, NewGrant, Requester, ResourceId, ShareToken, Timestamp,
    TokenSource,
};

use crate::error::{Result, StoreError};

/// How many tokens [`StoreExt::create`] mints before giving up.
pub const DEFAULT_TOKEN_ATTEMPTS: u32 = 5;

/// Result of inserting a grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// Grant was stored; carries the assigned id.
    Inserted(Grant),
    /// Another grant already holds this token. Nothing was written.
    TokenTaken,
}

/// Result of an owner-initiated revoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    /// The grant is revoked (now, or already was).
    Revoked,
    /// The requester neither owns the grant nor holds admin authority.
    Forbidden,
    /// No grant with that id.
    NotFound,
}

/// The Store trait: async interface for grant persistence.
///
/// All methods are async; implementations may block on durable I/O
/// internally. For SQLite, `spawn_blocking` keeps that off the runtime.
///
/// # Design Notes
///
/// - **Unique tokens**: `insert_grant` never overwrites. A taken token
///   returns `TokenTaken`.
/// - **Monotonic revocation**: no method un-revokes a grant.
/// - **Atomic usage counters**: `record_access` increments in storage so
///   concurrent evaluations of one token never lose updates.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Grant Creation
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a new grant.
    ///
    /// # Returns
    /// - `Inserted` with the stored grant (id assigned, counters zeroed).
    /// - `TokenTaken` if the token is already in use.
    async fn insert_grant(&self, grant: &NewGrant) -> Result<InsertResult>;

    // ─────────────────────────────────────────────────────────────────────────
    // Lookups
    // ─────────────────────────────────────────────────────────────────────────

    /// Find a grant by its public token.
    async fn find_by_token(&self, token: &ShareToken) -> Result<Option<Grant>>;

    /// Get a grant by its internal id.
    async fn get_grant(&self, grant_id: GrantId) -> Result<Option<Grant>>;

    /// All grants for a resource, in creation order.
    ///
    /// Ties on `created_at` are broken by grant id.
    async fn list_by_resource(&self, resource_id: &ResourceId) -> Result<Vec<Grant>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Revoke a grant on behalf of `requester`.
    ///
    /// Idempotent: revoking an already-revoked grant returns `Revoked` and
    /// keeps the original `revoked_at`.
    async fn revoke(
        &self,
        grant_id: GrantId,
        requester: &Requester,
        now: Timestamp,
    ) -> Result<RevokeOutcome>;

    /// Count one successful access: `access_count += 1`,
    /// `last_accessed_at = now`.
    ///
    /// Applies only to a grant that is not revoked. Returns the updated
    /// grant, or `None` if the grant is gone or was revoked in the meantime.
    async fn record_access(&self, grant_id: GrantId, now: Timestamp) -> Result<Option<Grant>>;
}

/// Extension trait for common store patterns.
pub trait StoreExt: Store {
    /// Create a grant with a freshly minted token.
    ///
    /// Mints a token, inserts, and on collision mints again, up to
    /// `max_attempts` times. Collisions never overwrite an existing grant.
    ///
    /// # Errors
    /// - `StoreError::Token` if the entropy source fails.
    /// - `StoreError::GenerationExhausted` if every attempt collided.
    fn create(
        &self,
        tokens: &dyn TokenSource,
        spec: GrantSpec,
        now: Timestamp,
        max_attempts: u32,
    ) -> impl std::future::Future<Output = Result<Grant>> + Send;
}

impl<S: Store + ?Sized> StoreExt for S {
    async fn create(
        &self,
        tokens: &dyn TokenSource,
        spec: GrantSpec,
        now: Timestamp,
        max_attempts: u32,
    ) -> Result<Grant> {
        for attempt in 1..=max_attempts {
            let token = tokens.generate()?;
            let new_grant = spec.clone().into_new(token, now);

            match self.insert_grant(&new_grant).await? {
                InsertResult::Inserted(grant) => {
                    tracing::info!(
                        grant_id = %grant.grant_id,
                        resource_id = %grant.resource_id,
                        tier = %grant.tier,
                        token = %grant.token.fingerprint(),
                        "created share grant"
                    );
                    return Ok(grant);
                }
                InsertResult::TokenTaken => {
                    tracing::warn!(attempt, max_attempts, "share token collision, minting again");
                }
            }
        }

        tracing::error!(
            attempts = max_attempts,
            resource_id = %spec.resource_id,
            "could not mint a unique share token"
        );
        Err(StoreError::GenerationExhausted {
            attempts: max_attempts,
        })
    }
}
