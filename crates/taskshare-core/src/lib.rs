//! # Taskshare Core
//!
//! Pure primitives for shared-task access: grants, permission tiers, and
//! the unguessable tokens that stand in for authentication.
//!
//! This crate contains no I/O, no storage, no networking. The only side
//! effect is reading the operating system's entropy source when minting
//! a token.
//!
//! ## Key Types
//!
//! - [`Grant`] - One shareable link: resource, owner, tier, expiry, usage
//! - [`ShareToken`] - The public credential presented by anonymous callers
//! - [`PermissionTier`] - `View < Edit < Admin`
//! - [`TokenSource`] - Where tokens come from ([`OsTokenSource`] in production)
//! - [`Clock`] - Server-side time used for expiry decisions

pub mod clock;
pub mod error;
pub mod grant;
pub mod tier;
pub mod token;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use error::CoreError;
pub use grant::{Grant, GrantSpec, GrantStatus, NewGrant};
pub use tier::PermissionTier;
pub use token::{OsTokenSource, ShareToken, TokenSource, TOKEN_BYTES};
pub use types::{GrantId, PrincipalId, Requester, ResourceId, Timestamp};
