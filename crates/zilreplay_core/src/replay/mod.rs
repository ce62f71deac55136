//! The replay engine.
//!
//! [`ReplayEngine::replay_record`] takes one raw record, converts it to host
//! order if asked, decodes it into a [`LogRecord`] and applies it through the
//! store. Decoding finishes before the store is touched, so a record that
//! fails to decode has no effect.

mod handlers;
mod held;

use std::borrow::Cow;

use tracing::{debug, warn};
use zilreplay_store::ObjectStore;

use crate::config::ReplayConfig;
use crate::error::{ReplayError, ReplayResult};
use crate::record::{LogRecord, RecordBody};
use crate::stats::ReplayStats;
use crate::swap::{normalize, peek_txtype};

/// What a successfully replayed record did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplayOutcome {
    /// The mutation was performed.
    Applied,
    /// A create found its object id already taken; nothing was changed.
    AlreadyApplied,
    /// The target object no longer exists; nothing was changed.
    TargetMissing,
}

impl ReplayOutcome {
    /// Returns true if the store was changed.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Replays intent-log records against an object store.
///
/// The engine holds no per-record state. Records must be fed one at a time;
/// the store is expected to be idempotent at the object-id level.
///
/// # Example
///
/// ```rust
/// use zilreplay_core::{ReplayEngine, ReplayError};
/// use zilreplay_store::InMemoryObjectStore;
///
/// let store = InMemoryObjectStore::new();
/// let engine = ReplayEngine::new(&store);
///
/// // Code 0 is reserved and never replayed.
/// let record = [0u8; 32];
/// let err = engine.replay_record(&record, false).unwrap_err();
/// assert!(matches!(err, ReplayError::Unsupported { code: 0 }));
/// assert!(store.calls().is_empty());
/// ```
#[derive(Debug)]
pub struct ReplayEngine<'s, S: ObjectStore + ?Sized> {
    store: &'s S,
    config: ReplayConfig,
    stats: ReplayStats,
}

impl<'s, S: ObjectStore + ?Sized> ReplayEngine<'s, S> {
    /// Creates an engine with the default configuration.
    pub fn new(store: &'s S) -> Self {
        Self::with_config(store, ReplayConfig::default())
    }

    /// Creates an engine with the given configuration.
    pub fn with_config(store: &'s S, config: ReplayConfig) -> Self {
        Self {
            store,
            config,
            stats: ReplayStats::new(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Returns the replay counters.
    pub fn stats(&self) -> &ReplayStats {
        &self.stats
    }

    /// Returns the store records are applied to.
    pub fn store(&self) -> &'s S {
        self.store
    }

    /// Replays one raw record.
    ///
    /// `byteswap` says the record was written in the opposite byte order. The
    /// transaction type is read from the first word before anything else; a
    /// reserved or unknown type is refused without reading further. A
    /// swapped record is converted in a private copy, so `record` is never
    /// modified.
    ///
    /// # Errors
    ///
    /// Decode errors as described on [`LogRecord::decode`], plus
    /// [`ReplayError::Store`] for store failures other than a missing target
    /// of a write, truncate, setattr or ACL record.
    pub fn replay_record(&self, record: &[u8], byteswap: bool) -> ReplayResult<ReplayOutcome> {
        let result = self.decode_and_apply(record, byteswap);
        self.account(&result);
        result
    }

    /// Applies a record that is already decoded.
    pub fn apply(&self, record: &LogRecord<'_>) -> ReplayResult<ReplayOutcome> {
        self.stats.record_seen(record.txtype());
        let result = self.dispatch(record);
        self.account(&result);
        result
    }

    fn decode_and_apply(&self, record: &[u8], byteswap: bool) -> ReplayResult<ReplayOutcome> {
        let (txtype, _) = peek_txtype(record, byteswap)?;
        self.stats.record_seen(txtype);
        if !txtype.is_replayable() {
            return Err(ReplayError::Unsupported {
                code: txtype.code(),
            });
        }

        let record: Cow<'_, [u8]> = if byteswap {
            let mut owned = record.to_vec();
            normalize(&mut owned)?;
            Cow::Owned(owned)
        } else {
            Cow::Borrowed(record)
        };
        let decoded = LogRecord::decode(&record, &self.config)?;
        debug!(
            kind = %decoded.txtype(),
            txg = decoded.header.txg,
            seq = decoded.header.seq,
            byteswap,
            "replaying record"
        );
        self.dispatch(&decoded)
    }

    fn dispatch(&self, record: &LogRecord<'_>) -> ReplayResult<ReplayOutcome> {
        let store = self.store;
        let flags = record.name_flags();
        match &record.body {
            RecordBody::Create(create) => handlers::create(store, create, flags),
            RecordBody::Remove { parent, name } => {
                handlers::remove(store, *parent, name, false, flags)
            }
            RecordBody::Rmdir { parent, name } => handlers::remove(store, *parent, name, true, flags),
            RecordBody::Link {
                parent,
                target,
                name,
            } => handlers::link(store, *parent, *target, name, flags),
            RecordBody::Rename {
                src_parent,
                src_name,
                dst_parent,
                dst_name,
            } => handlers::rename(store, *src_parent, src_name, *dst_parent, dst_name, flags),
            RecordBody::Write {
                object,
                offset,
                data,
            } => {
                let outcome = handlers::write(store, *object, *offset, data)?;
                if outcome.is_applied() {
                    self.stats.record_bytes_written(data.len() as u64);
                }
                Ok(outcome)
            }
            RecordBody::Truncate {
                object,
                offset,
                length,
            } => handlers::truncate(store, *object, *offset, *length),
            RecordBody::SetAttr {
                object,
                attrs,
                xoptattrs,
                identities,
            } => handlers::set_attributes(store, *object, attrs, xoptattrs.as_ref(), identities),
            RecordBody::SetAcl {
                object,
                acl,
                identities,
            } => handlers::set_acl(store, *object, acl, identities),
        }
    }

    fn account(&self, result: &ReplayResult<ReplayOutcome>) {
        match result {
            Ok(ReplayOutcome::Applied) => self.stats.record_applied(),
            Ok(ReplayOutcome::AlreadyApplied) => self.stats.record_already_applied(),
            Ok(ReplayOutcome::TargetMissing) => self.stats.record_target_missing(),
            Err(err) if err.is_unsupported() => {
                warn!(error = %err, "record not replayed");
                self.stats.record_unsupported();
            }
            Err(err) => {
                warn!(error = %err, fatal = err.is_fatal(), "record replay failed");
                self.stats.record_failed();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::layout::{FixedLayout, RemoveFields, TruncateFields, WriteFields};
    use crate::record::{LogHeader, TxType};
    use crate::swap::denormalize;
    use zilreplay_codec::RecordWriter;
    use zilreplay_store::{InMemoryObjectStore, ObjectId, StoreCall, ROOT_OBJECT_ID};

    fn record(txtype: TxType, body: impl FnOnce(&mut RecordWriter)) -> Vec<u8> {
        let mut writer = RecordWriter::new();
        LogHeader {
            txtype,
            case_insensitive: false,
            reclen: 0,
            txg: 3,
            seq: 1,
        }
        .write(&mut writer);
        body(&mut writer);
        writer.pad_to_word();
        writer.into_vec()
    }

    fn write_record(foid: u64, offset: u64, data: &[u8]) -> Vec<u8> {
        record(TxType::Write, |w| {
            WriteFields {
                foid,
                offset,
                length: data.len() as u64,
                ..WriteFields::default()
            }
            .write(w);
            w.put_bytes(data);
        })
    }

    #[test]
    fn write_applies_and_counts_bytes() {
        let store = InMemoryObjectStore::new();
        store
            .insert_file(ROOT_OBJECT_ID, b"f", ObjectId::new(42), b"")
            .unwrap();
        let engine = ReplayEngine::new(&store);
        let outcome = engine
            .replay_record(&write_record(42, 0, b"data"), false)
            .unwrap();
        assert_eq!(outcome, ReplayOutcome::Applied);
        assert_eq!(engine.stats().bytes_written(), 4);
        assert_eq!(engine.stats().seen(TxType::Write), 1);
        assert_eq!(store.outstanding_refs(), 0);
    }

    #[test]
    fn missing_write_target_is_tolerated() {
        let store = InMemoryObjectStore::new();
        let engine = ReplayEngine::new(&store);
        let outcome = engine
            .replay_record(&write_record(42, 0, b"data"), false)
            .unwrap();
        assert_eq!(outcome, ReplayOutcome::TargetMissing);
        assert!(store.mutations().is_empty());
        assert_eq!(engine.stats().bytes_written(), 0);
        assert_eq!(engine.stats().target_missing(), 1);
    }

    #[test]
    fn swapped_input_is_not_modified() {
        let store = InMemoryObjectStore::new();
        store
            .insert_file(ROOT_OBJECT_ID, b"f", ObjectId::new(9), b"0123456789")
            .unwrap();
        let mut foreign = record(TxType::Truncate, |w| {
            TruncateFields {
                foid: 9,
                offset: 4,
                length: 0,
            }
            .write(w);
        });
        denormalize(&mut foreign).unwrap();
        let copy = foreign.clone();

        let engine = ReplayEngine::new(&store);
        assert_eq!(
            engine.replay_record(&foreign, true).unwrap(),
            ReplayOutcome::Applied
        );
        assert_eq!(foreign, copy);
        assert_eq!(
            store.object(ObjectId::new(9)).unwrap().file_data(),
            Some(&b"0123"[..])
        );
    }

    #[test]
    fn hard_lookup_failure_is_an_error() {
        let store = InMemoryObjectStore::new();
        let engine = ReplayEngine::new(&store);
        let bytes = record(TxType::Remove, |w| {
            RemoveFields { doid: 77 }.write(w);
            w.put_cstr(b"x");
        });
        let err = engine.replay_record(&bytes, false).unwrap_err();
        assert!(matches!(err, ReplayError::Store(ref e) if e.is_not_found()));
        assert_eq!(engine.stats().failed(), 1);
        assert_eq!(store.calls(), vec![StoreCall::Lookup(ObjectId::new(77))]);
    }

    #[test]
    fn unknown_code_touches_nothing() {
        let store = InMemoryObjectStore::new();
        let engine = ReplayEngine::new(&store);
        let mut bytes = 25u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0xff; 3]);
        let err = engine.replay_record(&bytes, false).unwrap_err();
        assert!(matches!(err, ReplayError::Unsupported { code: 25 }));
        assert!(store.calls().is_empty());
        assert_eq!(engine.stats().unsupported(), 1);
    }

    #[test]
    fn decode_failure_has_no_effect() {
        let store = InMemoryObjectStore::new();
        store
            .insert_file(ROOT_OBJECT_ID, b"f", ObjectId::new(42), b"")
            .unwrap();
        let engine = ReplayEngine::new(&store);
        let mut bytes = write_record(42, 0, b"data");
        bytes.truncate(bytes.len() - 8);
        assert!(engine.replay_record(&bytes, false).is_err());
        assert!(store.calls().is_empty());
    }
}
