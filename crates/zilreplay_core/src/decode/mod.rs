//! Decoders for the trailing sub-structures of a record.
//!
//! Each decoder starts at the reader's cursor and leaves it on the first byte
//! after the structure it decoded, so the caller can go straight on to the
//! next one. None of them touches the object store.

pub mod acl;
pub mod fuid;
pub mod xvattr;

pub use acl::{
    current_acl_bytes, decode_current_aces, decode_legacy_aces, encode_aces, padded_acl_len,
};
pub use fuid::{compact_domain_count, decode_compact_domains, decode_identity_list, FUID_LEN};
pub use xvattr::{decode_xvattr, xvattr_block_len, XvattrBlock};
