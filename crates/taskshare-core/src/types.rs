//! Strong type definitions for task sharing.
//!
//! Identifiers are newtypes so a resource id can never be passed where an
//! owner id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unix timestamp in milliseconds.
pub type Timestamp = i64;

/// Internal identity of a grant row.
///
/// Shown to the owner (audit views, revoke) but never to anonymous callers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantId(pub i64);

impl GrantId {
    /// Get the raw value.
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Debug for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GrantId({})", self.0)
    }
}

impl fmt::Display for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for GrantId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Identity of a shared resource (a task). Opaque to this crate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identity of an authenticated principal, as supplied by the identity system.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrincipalId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An authenticated caller of an owner-only operation.
///
/// `admin` is set only when the identity system vouches for administrative
/// authority. Holding an admin-tier share link never sets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    /// Who is asking.
    pub id: PrincipalId,
    /// Whether the caller carries external admin authority.
    pub admin: bool,
}

impl Requester {
    /// A regular authenticated user.
    pub fn user(id: impl Into<PrincipalId>) -> Self {
        Self {
            id: id.into(),
            admin: false,
        }
    }

    /// A user with administrative authority over all grants.
    pub fn admin(id: impl Into<PrincipalId>) -> Self {
        Self {
            id: id.into(),
            admin: true,
        }
    }

    /// Whether this requester may administer a grant owned by `owner`.
    pub fn may_administer(&self, owner: &PrincipalId) -> bool {
        self.admin || &self.id == owner
    }
}

impl From<String> for PrincipalId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
