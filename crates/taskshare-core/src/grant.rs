//! Grants: one record per shareable link.
//!
//! A grant moves `Active -> Revoked` by an explicit, stored transition.
//! `Expired` is never stored; it is computed from `expires_at` at the time
//! of the check.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::tier::PermissionTier;
use crate::token::ShareToken;
use crate::types::{GrantId, PrincipalId, ResourceId, Timestamp};

/// A persisted grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// Internal row identity.
    pub grant_id: GrantId,

    /// The shared task.
    pub resource_id: ResourceId,

    /// Who created the grant.
    pub owner_id: PrincipalId,

    /// The anonymous credential.
    pub token: ShareToken,

    /// What the token lets its holder do. Fixed at creation.
    pub tier: PermissionTier,

    /// When the link stops working. `None` never expires.
    pub expires_at: Option<Timestamp>,

    /// Set once, never cleared.
    pub revoked: bool,

    /// When the first successful revoke happened.
    pub revoked_at: Option<Timestamp>,

    /// Successful evaluations so far.
    pub access_count: u64,

    /// Time of the most recent successful evaluation.
    pub last_accessed_at: Option<Timestamp>,

    /// Creation time.
    pub created_at: Timestamp,
}

/// Computed lifecycle state of a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantStatus {
    Active,
    Expired,
    Revoked,
}

impl Grant {
    /// Whether the expiry has passed. A grant is still usable at exactly
    /// `expires_at`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        matches!(self.expires_at, Some(expires) if now > expires)
    }

    /// Lifecycle state at `now`. Revocation wins over expiry.
    pub fn status(&self, now: Timestamp) -> GrantStatus {
        if self.revoked {
            GrantStatus::Revoked
        } else if self.is_expired(now) {
            GrantStatus::Expired
        } else {
            GrantStatus::Active
        }
    }

    /// Whether the token currently opens the resource.
    pub fn is_valid(&self, now: Timestamp) -> bool {
        self.status(now) == GrantStatus::Active
    }
}

/// What an owner asks for when sharing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantSpec {
    pub resource_id: ResourceId,
    pub owner_id: PrincipalId,
    pub tier: PermissionTier,
    /// Lifetime from creation. `None` never expires.
    pub ttl: Option<Duration>,
}

impl GrantSpec {
    pub fn new(resource_id: ResourceId, owner_id: PrincipalId, tier: PermissionTier) -> Self {
        Self {
            resource_id,
            owner_id,
            tier,
            ttl: None,
        }
    }

    /// Set the lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Bind a minted token and creation time, producing an insertable row.
    pub fn into_new(self, token: ShareToken, now: Timestamp) -> NewGrant {
        let expires_at = self.ttl.map(|ttl| {
            let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
            now.saturating_add(ttl_ms)
        });
        NewGrant {
            resource_id: self.resource_id,
            owner_id: self.owner_id,
            token,
            tier: self.tier,
            expires_at,
            created_at: now,
        }
    }
}

/// A grant that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGrant {
    pub resource_id: ResourceId,
    pub owner_id: PrincipalId,
    pub token: ShareToken,
    pub tier: PermissionTier,
    pub expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl NewGrant {
    /// The stored form, once the store has assigned an id.
    pub fn into_grant(self, grant_id: GrantId) -> Grant {
        Grant {
            grant_id,
            resource_id: self.resource_id,
            owner_id: self.owner_id,
            token: self.token,
            tier: self.tier,
            expires_at: self.expires_at,
            revoked: false,
            revoked_at: None,
            access_count: 0,
            last_accessed_at: None,
            created_at: self.created_at,
        }
    }
}
