//! # Taskshare
//!
//! Share a task through an unguessable link, with a permission tier and an
//! optional expiry, and let the owner audit and revoke it.
//!
//! ## Overview
//!
//! - **Grants**: one per link. A grant carries the token, the tier
//!   (`view`, `edit`, `admin`), an optional expiry and usage counters.
//! - **Access**: an anonymous holder presents the token. It is checked for
//!   existence, then revocation, then expiry. Every successful check is
//!   counted.
//! - **Updates**: the tier's allow-list decides which task fields a holder
//!   may change. Anything else is rejected.
//! - **Revocation**: owner-only, immediate and permanent.
//!
//! Tasks, identity, and mail delivery live elsewhere and are reached
//! through [`ResourceProvider`] and [`Notifier`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use taskshare::{Expiry, LogNotifier, ResourceProvider, ShareConfig, ShareRequest, ShareService};
//! use taskshare::core::{PermissionTier, Requester};
//! use taskshare::store::SqliteStore;
//!
//! async fn example<R: ResourceProvider>(tasks: Arc<R>) {
//!     let store = Arc::new(SqliteStore::open("shares.db").unwrap());
//!     let config = ShareConfig::from_env().unwrap();
//!     let service = ShareService::new(store, tasks, Arc::new(LogNotifier), config);
//!
//!     let request = ShareRequest::new("task-42", PermissionTier::Edit)
//!         .recipients(["bob@example.com"])
//!         .expiry(Expiry::Days(7));
//!     let receipt = service
//!         .share(&Requester::user("alice"), request)
//!         .await
//!         .unwrap()
//!         .done()
//!         .unwrap();
//!
//!     let opened = service.access(receipt.token.as_str()).await.unwrap();
//!     println!("{:?}", opened);
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `taskshare::core` - Grants, tiers, tokens, clock
//! - `taskshare::store` - Grant storage and SQLite
//! - `taskshare::perms` - Access evaluation and mutation guard

pub mod config;
pub mod error;
pub mod notify;
pub mod resource;
pub mod service;

// Re-export component crates
pub use taskshare_core as core;
pub use taskshare_perms as perms;
pub use taskshare_store as store;

// Re-export main types for convenience
pub use config::{ConfigError, ShareConfig};
pub use error::{Result, ShareError};
pub use notify::{DeliveryOutcome, Invitation, LogNotifier, Notifier};
pub use resource::{ResourceProvider, TaskSnapshot};
pub use service::{
    AccessOutcome, Expiry, GrantView, OwnerOutcome, ShareInfo, ShareReceipt, ShareRequest,
    ShareService, SharedTask, UpdateOutcome,
};

// Re-export commonly used types from the component crates
pub use taskshare_core::{GrantId, PermissionTier, PrincipalId, Requester, ResourceId, ShareToken};
pub use taskshare_perms::{DenyReason, FieldSet, FieldUpdate, MutationDenial, TaskField, TaskStatus};
pub use taskshare_store::RevokeOutcome;
