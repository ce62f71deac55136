//! # zilreplay testkit
//!
//! Test utilities for zilreplay.
//!
//! This crate provides:
//! - Record builders producing bit-exact host-order and foreign-order records
//! - Property-based record generators using proptest
//! - A populated in-memory store and engine helpers that check for leaked
//!   object references
//! - Replay test vectors serializable to JSON
//!
//! ## Usage
//!
//! ```rust
//! use zilreplay_core::ReplayOutcome;
//! use zilreplay_testkit::prelude::*;
//!
//! with_engine(|store, engine| {
//!     let record = builders::remove(1, b"notes.txt").build();
//!     assert_eq!(engine.replay_record(&record, false).unwrap(), ReplayOutcome::Applied);
//!     assert!(store.object(NOTES_FILE).is_none());
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod builders;
pub mod fixtures;
pub mod generators;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::builders::{self, RecordBuilder};
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::vectors::*;
}

pub use fixtures::*;
pub use generators::*;
pub use vectors::*;
