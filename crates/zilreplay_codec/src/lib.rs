//! # zilreplay codec
//!
//! Low-level wire primitives for intent-log records.
//!
//! Intent-log records carry no total length. Every nested structure is sized
//! by a count that precedes it, so decoding is a strictly sequential walk.
//! This crate provides the three tools that walk is built from:
//!
//! - [`RecordReader`] - a bounds-checked cursor that never reads past the
//!   buffer and reports the exact offset of any truncation
//! - [`ByteSwapper`] - an in-place converter between the writer's byte order
//!   and host order that hands back each field's host value as it goes
//! - [`RecordWriter`] - the inverse of the reader, used to build records
//!
//! Host order for this crate is little-endian.
//!
//! ## Usage
//!
//! ```
//! use zilreplay_codec::{RecordReader, RecordWriter};
//!
//! let mut writer = RecordWriter::new();
//! writer.put_u64(7);
//! writer.put_cstr(b"foo.txt");
//! let bytes = writer.into_vec();
//!
//! let mut reader = RecordReader::new(&bytes);
//! assert_eq!(reader.read_u64().unwrap(), 7);
//! assert_eq!(reader.read_cstr().unwrap(), b"foo.txt");
//! assert!(reader.is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod reader;
mod swap;
mod writer;

pub use error::{CodecError, CodecResult};
pub use reader::{round_up_u64, RecordReader, WORD_SIZE};
pub use swap::{ByteSwapper, SwapDirection};
pub use writer::RecordWriter;
