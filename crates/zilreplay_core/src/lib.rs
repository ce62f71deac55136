//! # zilreplay core
//!
//! Decoding and idempotent replay of filesystem intent-log records.
//!
//! An intent log holds one record per completed but not yet committed
//! mutation. After a crash each record is replayed against the object store,
//! possibly more than once and not necessarily in order, and must take effect
//! exactly once. This crate provides:
//!
//! - [`record`] - transaction types, the common header and fixed payloads
//! - [`decode`] - decoders for the extended-attribute block, identity and
//!   domain tables, and access-control entry arrays
//! - [`normalize`] / [`denormalize`] - in-place byte-order conversion
//! - [`LogRecord`] - a fully decoded record
//! - [`ReplayEngine`] - dispatch to per-kind handlers against an
//!   [`ObjectStore`](zilreplay_store::ObjectStore)
//!
//! Records carry no total length. Every trailing structure is sized by a
//! count stored before it, so decoding walks each record strictly in layout
//! order with a bounds-checked reader and rejects records that end early or
//! run long.
//!
//! ## Quick start
//!
//! ```rust
//! use zilreplay_codec::RecordWriter;
//! use zilreplay_core::layout::{CreateFields, FixedLayout};
//! use zilreplay_core::{LogHeader, ReplayEngine, ReplayOutcome, TxType};
//! use zilreplay_store::{InMemoryObjectStore, ObjectId, ROOT_OBJECT_ID};
//!
//! let mut writer = RecordWriter::new();
//! LogHeader { txtype: TxType::Create, case_insensitive: false, reclen: 0, txg: 1, seq: 1 }
//!     .write(&mut writer);
//! CreateFields { doid: 1, foid: 20, mode: 0o100_644, uid: 1000, gid: 100, ..Default::default() }
//!     .write(&mut writer);
//! writer.put_cstr(b"foo.txt");
//! writer.pad_to_word();
//! let record = writer.into_vec();
//!
//! let store = InMemoryObjectStore::new();
//! let engine = ReplayEngine::new(&store);
//! assert_eq!(engine.replay_record(&record, false).unwrap(), ReplayOutcome::Applied);
//! assert_eq!(engine.replay_record(&record, false).unwrap(), ReplayOutcome::AlreadyApplied);
//! assert_eq!(store.lookup_name(ROOT_OBJECT_ID, b"foo.txt"), Some(ObjectId::new(20)));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
pub mod decode;
mod error;
pub mod record;
mod replay;
mod stats;
mod swap;

pub use config::{ReplayConfig, DEFAULT_XVA_MAP_SIZE};
pub use error::{ReplayError, ReplayResult};
pub use record::layout;
pub use record::{
    CreateKind, CreateRecord, LogHeader, LogRecord, RecordBody, TxType, TX_CI, TX_MAX_TYPE,
};
pub use replay::{ReplayEngine, ReplayOutcome};
pub use stats::{ReplayStats, StatsSnapshot};
pub use swap::{denormalize, normalize, peek_txtype};
