//! Replay statistics.
//!
//! Counters are updated once per record by the engine, after the outcome of
//! the record is known.
//!
//! # Usage
//!
//! ```rust
//! use zilreplay_core::ReplayEngine;
//! use zilreplay_store::InMemoryObjectStore;
//!
//! let store = InMemoryObjectStore::new();
//! let engine = ReplayEngine::new(&store);
//! let snap = engine.stats().snapshot();
//! assert_eq!(snap.applied, 0);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use crate::record::{TxType, TX_MAX_TYPE};

/// Replay counters.
///
/// All counters are atomic and monotonically increasing.
#[derive(Debug, Default)]
pub struct ReplayStats {
    /// Records whose mutation was performed.
    applied: AtomicU64,
    /// Create records skipped because the object already existed.
    already_applied: AtomicU64,
    /// Records skipped because their target object no longer exists.
    target_missing: AtomicU64,
    /// Records refused as unsupported or needing a disabled capability.
    unsupported: AtomicU64,
    /// Records that failed to decode or apply.
    failed: AtomicU64,
    /// File data bytes written by write records.
    bytes_written: AtomicU64,
    /// Records seen, by transaction-type code.
    per_type: [AtomicU64; TX_MAX_TYPE],
}

impl ReplayStats {
    /// Creates a zeroed instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_seen(&self, txtype: TxType) {
        if let Some(slot) = usize::try_from(txtype.code())
            .ok()
            .and_then(|code| self.per_type.get(code))
        {
            slot.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_applied(&self) {
        self.applied.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_already_applied(&self) {
        self.already_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_target_missing(&self) {
        self.target_missing.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unsupported(&self) {
        self.unsupported.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_bytes_written(&self, bytes: u64) {
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Returns the number of records applied.
    pub fn applied(&self) -> u64 {
        self.applied.load(Ordering::Relaxed)
    }

    /// Returns the number of create records found already applied.
    pub fn already_applied(&self) -> u64 {
        self.already_applied.load(Ordering::Relaxed)
    }

    /// Returns the number of records skipped for a missing target.
    pub fn target_missing(&self) -> u64 {
        self.target_missing.load(Ordering::Relaxed)
    }

    /// Returns the number of records refused as unsupported.
    pub fn unsupported(&self) -> u64 {
        self.unsupported.load(Ordering::Relaxed)
    }

    /// Returns the number of records that failed.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Returns the file data bytes written.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Returns how many records of `txtype` were seen. Always zero for codes
    /// past the defined range.
    pub fn seen(&self, txtype: TxType) -> u64 {
        usize::try_from(txtype.code())
            .ok()
            .and_then(|code| self.per_type.get(code))
            .map_or(0, |slot| slot.load(Ordering::Relaxed))
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        let mut per_type = [0; TX_MAX_TYPE];
        for (out, slot) in per_type.iter_mut().zip(&self.per_type) {
            *out = slot.load(Ordering::Relaxed);
        }
        StatsSnapshot {
            applied: self.applied(),
            already_applied: self.already_applied(),
            target_missing: self.target_missing(),
            unsupported: self.unsupported(),
            failed: self.failed(),
            bytes_written: self.bytes_written(),
            per_type,
        }
    }
}

/// A point-in-time copy of [`ReplayStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Records applied.
    pub applied: u64,
    /// Create records found already applied.
    pub already_applied: u64,
    /// Records skipped for a missing target.
    pub target_missing: u64,
    /// Records refused as unsupported.
    pub unsupported: u64,
    /// Records that failed.
    pub failed: u64,
    /// File data bytes written.
    pub bytes_written: u64,
    /// Records seen, indexed by transaction-type code.
    pub per_type: [u64; TX_MAX_TYPE],
}

impl StatsSnapshot {
    /// Returns the total number of records seen.
    pub fn total(&self) -> u64 {
        self.applied + self.already_applied + self.target_missing + self.unsupported + self.failed
    }
}
