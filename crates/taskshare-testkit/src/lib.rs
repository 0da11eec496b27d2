//! # Taskshare Testkit
//!
//! Testing utilities for taskshare.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a ready-wired [`TestFixture`] with an in-memory grant
//!   store, a fake task store, a recording notifier and a manual clock
//! - **Fakes**: [`ManualClock`], deterministic and colliding token sources,
//!   [`MemoryResources`]
//! - **Generators**: Proptest strategies for property-based testing
//!
//! End-to-end scenarios live in this crate's `tests/` directory.
//!
//! ## Test Fixtures
//!
//! ```rust
//! use taskshare_testkit::fixtures::{TestFixture, START};
//!
//! let fixture = TestFixture::new();
//! assert_eq!(fixture.now(), START);
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use taskshare_testkit::generators::tier;
//!
//! proptest! {
//!     #[test]
//!     fn view_is_lowest(t in tier()) {
//!         prop_assert!(t >= taskshare_core::PermissionTier::View);
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{
    init_tracing, task, BrokenTokenSource, FixedTokenSource, ManualClock, MemoryResources,
    SequenceTokenSource, TestFixture, DAY_MS, START,
};
