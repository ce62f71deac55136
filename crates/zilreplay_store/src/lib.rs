//! # zilreplay store
//!
//! The object-store side of intent-log replay.
//!
//! Replay decodes a log record and then asks an object store to perform the
//! mutation it describes. This crate defines that contract and the values
//! that cross it:
//!
//! - [`ObjectStore`] - lookup, create, remove, link, rename, write, free,
//!   set-attributes and set-ACL primitives, plus reference release
//! - [`Vattr`] and [`XoptAttrs`] - base and extended attributes
//! - [`AclSet`] and [`Ace`] - decoded access-control lists
//! - [`IdentityContext`] and [`IdentityRef`] - record-local identity data
//!   that the store resolves against its own identity mapping
//!
//! [`InMemoryObjectStore`] is a complete reference implementation. It records
//! every primitive call and tracks outstanding object references, which makes
//! it the store of choice for tests.
//!
//! ## Example
//!
//! ```rust
//! use zilreplay_store::{InMemoryObjectStore, ObjectStore, ROOT_OBJECT_ID};
//!
//! let store = InMemoryObjectStore::new();
//! let root = store.lookup(ROOT_OBJECT_ID).unwrap();
//! assert_eq!(root.id(), ROOT_OBJECT_ID);
//! store.release(root);
//! assert_eq!(store.outstanding_refs(), 0);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod acl;
mod attr;
mod backend;
mod error;
mod identity;
mod memory;
mod types;

pub use acl::{
    Ace, AclEncoding, AclSet, ObjectAceGuids, ACE_ACCESS_ALLOWED_OBJECT_ACE_TYPE,
    ACE_ACCESS_DENIED_OBJECT_ACE_TYPE, ACE_EVERYONE, ACE_GROUP, ACE_IDENTIFIER_GROUP,
    ACE_OWNER, ACE_SYSTEM_ALARM_OBJECT_ACE_TYPE, ACE_SYSTEM_AUDIT_OBJECT_ACE_TYPE,
    ACE_TYPE_FLAGS,
};
pub use attr::{
    AttrMask, FileKind, Timestamp, Vattr, XattrSet, XoptAttrs, AV_SCANSTAMP_LEN, MODE_MASK,
};
pub use backend::{CreateOptions, NameFlags, ObjectRef, ObjectStore};
pub use error::{StoreError, StoreResult};
pub use identity::{EphemeralId, IdentityContext, IdentityRef, PendingIdentity, MAXUID};
pub use memory::{
    InMemoryObjectStore, ObjectData, StoreCall, StoredObject, MAX_FILE_SIZE, ROOT_OBJECT_ID,
};
pub use types::ObjectId;
