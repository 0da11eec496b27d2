//! Permission tiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Capability level carried by a grant.
///
/// Totally ordered: `View < Edit < Admin`. A higher tier can do everything a
/// lower tier can. The variant order below is load-bearing for `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionTier {
    /// Read the shared task.
    View,
    /// Change operational fields (status, notes).
    Edit,
    /// Also change the fields that define the task.
    Admin,
}

impl PermissionTier {
    /// All tiers in ascending order.
    pub const ALL: [PermissionTier; 3] = [
        PermissionTier::View,
        PermissionTier::Edit,
        PermissionTier::Admin,
    ];

    /// The lowercase wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PermissionTier::View => "view",
            PermissionTier::Edit => "edit",
            PermissionTier::Admin => "admin",
        }
    }

    /// Whether this tier includes everything `other` allows.
    pub fn includes(&self, other: PermissionTier) -> bool {
        *self >= other
    }
}

impl Default for PermissionTier {
    fn default() -> Self {
        PermissionTier::View
    }
}

impl fmt::Display for PermissionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionTier {
    type Err = CoreError;

    /// Exact match only. `"Edit"` or `"edit "` are rejected, not normalized.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(PermissionTier::View),
            "edit" => Ok(PermissionTier::Edit),
            "admin" => Ok(PermissionTier::Admin),
            other => Err(CoreError::InvalidTier(other.to_string())),
        }
    }
}
