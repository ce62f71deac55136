//! Object store trait definition.

use crate::acl::AclSet;
use crate::attr::{Vattr, XoptAttrs};
use crate::error::StoreResult;
use crate::identity::IdentityContext;
use crate::types::ObjectId;

/// A held reference to a live object.
///
/// Returned by [`ObjectStore::lookup`] and by the create family. Every
/// reference must be handed back through [`ObjectStore::release`]; it is
/// deliberately not `Clone`, so each one is released exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct ObjectRef {
    id: ObjectId,
    token: u64,
}

impl ObjectRef {
    /// Creates a reference. Intended for store implementations.
    #[must_use]
    pub const fn new(id: ObjectId, token: u64) -> Self {
        Self { id, token }
    }

    /// Returns the id of the referenced object.
    #[must_use]
    pub const fn id(&self) -> ObjectId {
        self.id
    }

    /// Returns the store-specific hold token.
    #[must_use]
    pub const fn token(&self) -> u64 {
        self.token
    }
}

/// Options for name-based primitives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NameFlags {
    /// Match directory entries without regard to case.
    pub case_insensitive: bool,
}

impl NameFlags {
    /// Flags with case-insensitive matching set as given.
    #[must_use]
    pub const fn case_insensitive(value: bool) -> Self {
        Self {
            case_insensitive: value,
        }
    }
}

/// Optional inputs to the create family.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateOptions<'a> {
    /// Name matching options.
    pub flags: NameFlags,
    /// Extended attributes to apply to the new object.
    pub xoptattrs: Option<&'a XoptAttrs>,
    /// Initial access-control list.
    pub acl: Option<&'a AclSet>,
    /// Identity data for ephemeral owner, group and ACL ids.
    pub identities: Option<&'a IdentityContext>,
}

/// The object-store primitives that replay is built on.
///
/// The store is transactional and idempotent at the object-id level; replay
/// relies on that and adds no locking of its own. Calls for one filesystem
/// arrive strictly one at a time.
///
/// # Invariants
///
/// - `lookup` fails with [`StoreError::NotFound`](crate::StoreError::NotFound)
///   and nothing else when the id is free
/// - objects created through the create family take the id in
///   [`Vattr::nodeid`]
/// - `write` applies data directly and never appends to the intent log
/// - `release` accepts any reference the store handed out and is a no-op for
///   one it has already released
pub trait ObjectStore: Send + Sync {
    /// Returns whether an object occupies `id`, without taking a reference.
    fn contains_object(&self, id: ObjectId) -> StoreResult<bool>;

    /// Takes a reference to the object with the given id.
    fn lookup(&self, id: ObjectId) -> StoreResult<ObjectRef>;

    /// Drops a reference.
    fn release(&self, object: ObjectRef);

    /// Creates a regular file (or device node, fifo or socket) named `name`
    /// in `parent`.
    fn create(
        &self,
        parent: &ObjectRef,
        name: &[u8],
        attrs: &Vattr,
        options: &CreateOptions<'_>,
    ) -> StoreResult<ObjectRef>;

    /// Creates a directory named `name` in `parent`.
    fn mkdir(
        &self,
        parent: &ObjectRef,
        name: &[u8],
        attrs: &Vattr,
        options: &CreateOptions<'_>,
    ) -> StoreResult<ObjectRef>;

    /// Creates the hidden extended-attribute directory of `parent`.
    fn make_xattr_dir(
        &self,
        parent: &ObjectRef,
        attrs: &Vattr,
        options: &CreateOptions<'_>,
    ) -> StoreResult<ObjectRef>;

    /// Creates a symbolic link named `name` in `parent` pointing at `target`.
    fn symlink(
        &self,
        parent: &ObjectRef,
        name: &[u8],
        attrs: &Vattr,
        target: &[u8],
        options: &CreateOptions<'_>,
    ) -> StoreResult<ObjectRef>;

    /// Removes the non-directory entry `name` from `parent`.
    fn remove(&self, parent: &ObjectRef, name: &[u8], flags: NameFlags) -> StoreResult<()>;

    /// Removes the empty directory `name` from `parent`.
    fn rmdir(&self, parent: &ObjectRef, name: &[u8], flags: NameFlags) -> StoreResult<()>;

    /// Adds a hard link to `target` named `name` in `parent`.
    fn link(
        &self,
        parent: &ObjectRef,
        target: &ObjectRef,
        name: &[u8],
        flags: NameFlags,
    ) -> StoreResult<()>;

    /// Moves `src_name` in `src_parent` to `dst_name` in `dst_parent`.
    fn rename(
        &self,
        src_parent: &ObjectRef,
        src_name: &[u8],
        dst_parent: &ObjectRef,
        dst_name: &[u8],
        flags: NameFlags,
    ) -> StoreResult<()>;

    /// Writes `data` at `offset`, synchronously and without logging.
    fn write(&self, object: &ObjectRef, offset: u64, data: &[u8]) -> StoreResult<()>;

    /// Frees the byte range `[offset, offset + len)`. A zero `len` frees
    /// everything from `offset` to the end of the object and sets its size
    /// to `offset`. A non-zero range is clamped to the current size and
    /// never grows the object.
    fn free_range(&self, object: &ObjectRef, offset: u64, len: u64) -> StoreResult<()>;

    /// Applies the fields of `attrs` selected by its mask.
    fn set_attributes(
        &self,
        object: &ObjectRef,
        attrs: &Vattr,
        xoptattrs: Option<&XoptAttrs>,
        identities: Option<&IdentityContext>,
    ) -> StoreResult<()>;

    /// Replaces the access-control list.
    fn set_acl(
        &self,
        object: &ObjectRef,
        acl: &AclSet,
        identities: Option<&IdentityContext>,
    ) -> StoreResult<()>;
}
