//! Mutation guard: which field changes a tier may make.
//!
//! Strict allow-list. A field not listed for the tier is rejected, and an
//! unrecognised field name is rejected at every tier. Requests are
//! all-or-nothing: one rejected field denies the whole request.
//!
//! Nothing here lets a share link create or revoke grants. That stays on
//! the authenticated owner path whatever the tier.

use serde::Serialize;

use taskshare_core::PermissionTier;

use crate::field::{allowed_fields, FieldSet, TaskField};

/// Why a mutation was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "fields", rename_all = "snake_case")]
pub enum MutationDenial {
    /// The tier has no mutation rights at all.
    ReadOnly,
    /// The request named no fields.
    Empty,
    /// These requested fields are unknown or above the tier.
    Disallowed(Vec<String>),
}

impl MutationDenial {
    /// HTTP status for this denial.
    pub fn status_code(&self) -> u16 {
        match self {
            MutationDenial::Empty => 400,
            MutationDenial::ReadOnly | MutationDenial::Disallowed(_) => 403,
        }
    }

    /// Message safe to show an anonymous caller.
    pub fn public_message(&self) -> String {
        match self {
            MutationDenial::ReadOnly => "This link does not allow editing".to_string(),
            MutationDenial::Empty => "No update fields provided".to_string(),
            MutationDenial::Disallowed(fields) => {
                format!("This link does not allow editing: {}", fields.join(", "))
            }
        }
    }
}

/// The guard's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationDecision {
    /// Every requested field may change.
    Allowed(FieldSet),
    Denied(MutationDenial),
}

impl MutationDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, MutationDecision::Allowed(_))
    }
}

/// Decide whether `tier` may change the fields named in `requested`.
pub fn authorize_mutation<I, N>(tier: PermissionTier, requested: I) -> MutationDecision
where
    I: IntoIterator<Item = N>,
    N: AsRef<str>,
{
    let names: Vec<N> = requested.into_iter().collect();

    if names.is_empty() {
        return MutationDecision::Denied(MutationDenial::Empty);
    }

    let allow_list = allowed_fields(tier);
    if allow_list.is_empty() {
        return MutationDecision::Denied(MutationDenial::ReadOnly);
    }

    let mut allowed = FieldSet::new();
    let mut rejected: Vec<String> = Vec::new();

    for name in &names {
        let name = name.as_ref();
        match TaskField::from_name(name) {
            Some(field) if allow_list.contains(&field) => {
                allowed.insert(field);
            }
            _ => {
                if !rejected.iter().any(|r| r == name) {
                    rejected.push(name.to_string());
                }
            }
        }
    }

    if !rejected.is_empty() {
        tracing::debug!(%tier, ?rejected, "mutation rejected by allow-list");
        return MutationDecision::Denied(MutationDenial::Disallowed(rejected));
    }

    MutationDecision::Allowed(allowed)
}
