//! # Taskshare Permissions
//!
//! Deciding what an anonymous share-link holder may do.
//!
//! ## Overview
//!
//! Two decisions are made on every anonymous request:
//!
//! 1. **Access**: does the token open the task at all? The
//!    [`AccessEvaluator`] answers `Allow`, `NotFound`, `Revoked` or
//!    `Expired`, checked in that fixed order, and counts the access on
//!    `Allow`.
//! 2. **Mutation**: may this tier change these fields?
//!    [`authorize_mutation`] consults a per-tier allow-list of
//!    [`TaskField`]s. Anything not on the list is rejected, including
//!    field names nobody has heard of.
//!
//! Denials are ordinary return values ([`AccessDecision`],
//! [`MutationDecision`]). Only storage faults surface as [`PermsError`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use taskshare_core::{PermissionTier, ShareToken};
//! use taskshare_perms::{authorize_mutation, AccessDecision, AccessEvaluator, MutationDecision};
//! use taskshare_store::MemoryStore;
//!
//! async fn example(token: ShareToken, now: i64) {
//!     let evaluator = AccessEvaluator::new(Arc::new(MemoryStore::new()));
//!
//!     if let AccessDecision::Allow { tier, .. } = evaluator.evaluate(&token, now).await.unwrap() {
//!         match authorize_mutation(tier, ["status"]) {
//!             MutationDecision::Allowed(fields) => println!("may change {:?}", fields),
//!             MutationDecision::Denied(why) => println!("denied: {:?}", why),
//!         }
//!     }
//! }
//! ```

pub mod error;
pub mod evaluator;
pub mod field;
pub mod guard;
pub mod update;

pub use error::{PermsError, Result};
pub use evaluator::{AccessDecision, AccessEvaluator, DenyReason};
pub use field::{allowed_fields, FieldSet, TaskField};
pub use guard::{authorize_mutation, MutationDecision, MutationDenial};
pub use update::{FieldUpdate, TaskStatus};
