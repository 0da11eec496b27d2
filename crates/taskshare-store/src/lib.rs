//! # Taskshare Store
//!
//! Storage abstraction for share grants. Provides a trait-based interface
//! for grant persistence with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The [`Store`] trait is the only mutable shared state in the sharing
//! system. Every mutation goes through one of three single-record atomic
//! operations: [`Store::insert_grant`], [`Store::revoke`] and
//! [`Store::record_access`]. The primary implementation is [`SqliteStore`],
//! with [`MemoryStore`] for tests.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`StoreExt`] - Grant creation with token minting and collision retry
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`InsertResult`] / [`RevokeOutcome`] - Expected, non-error outcomes
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use taskshare_core::{GrantSpec, OsTokenSource, PermissionTier};
//! use taskshare_store::{SqliteStore, StoreExt, DEFAULT_TOKEN_ATTEMPTS};
//!
//! async fn example() {
//!     let store = SqliteStore::open("shares.db").unwrap();
//!
//!     let spec = GrantSpec::new("task-7".into(), "alice".into(), PermissionTier::Edit)
//!         .with_ttl(Duration::from_secs(30 * 24 * 60 * 60));
//!     let grant = store
//!         .create(&OsTokenSource, spec, 1_700_000_000_000, DEFAULT_TOKEN_ATTEMPTS)
//!         .await
//!         .unwrap();
//!     println!("share link token: {}", grant.token.as_str());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **No overwrite on collision**: a token that already exists yields
//!   `TokenTaken`; creation retries a bounded number of times, then fails
//!   with `GenerationExhausted`.
//! - **Atomic counters**: access counts are incremented in storage, never
//!   read-modified-written by the caller.
//! - **Nothing is deleted**: revoked and expired grants stay as audit trail.

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{InsertResult, RevokeOutcome, Store, StoreExt, DEFAULT_TOKEN_ATTEMPTS};
