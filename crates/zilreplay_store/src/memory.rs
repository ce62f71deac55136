//! In-memory object store for testing.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use crate::acl::AclSet;
use crate::attr::{FileKind, Vattr, XoptAttrs};
use crate::backend::{CreateOptions, NameFlags, ObjectRef, ObjectStore};
use crate::error::{StoreError, StoreResult};
use crate::identity::IdentityContext;
use crate::types::ObjectId;

/// Id of the root directory every [`InMemoryObjectStore`] starts with.
pub const ROOT_OBJECT_ID: ObjectId = ObjectId(1);

/// Largest file [`InMemoryObjectStore`] will hold, in bytes. Writes,
/// truncations and size changes that would grow a file past this fail with
/// [`StoreError::Unsupported`].
pub const MAX_FILE_SIZE: u64 = 1 << 26;

/// Converts a file extent to a buffer length, refusing extents past
/// [`MAX_FILE_SIZE`].
fn file_extent(extent: u64, what: &str) -> StoreResult<usize> {
    if extent > MAX_FILE_SIZE {
        return Err(StoreError::unsupported(format!(
            "{what} {extent} beyond {MAX_FILE_SIZE} bytes"
        )));
    }
    usize::try_from(extent).map_err(|_| StoreError::unsupported(what))
}

/// Contents of a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectData {
    /// File bytes.
    File(Vec<u8>),
    /// Directory entries by name.
    Directory(BTreeMap<Vec<u8>, ObjectId>),
    /// Symlink target.
    Symlink(Vec<u8>),
}

/// An object held by [`InMemoryObjectStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Object id.
    pub id: ObjectId,
    /// Contents.
    pub data: ObjectData,
    /// Base attributes as last set.
    pub attrs: Vattr,
    /// Extended attributes as last set.
    pub xoptattrs: Option<XoptAttrs>,
    /// Access-control list as last set.
    pub acl: Option<AclSet>,
    /// Identity context handed in with the last mutation.
    pub identities: Option<IdentityContext>,
    /// Number of directory entries naming this object.
    pub links: u32,
    /// Extended-attribute directory, once created.
    pub xattr_dir: Option<ObjectId>,
}

impl StoredObject {
    fn new(id: ObjectId, data: ObjectData, attrs: Vattr) -> Self {
        Self {
            id,
            data,
            attrs,
            xoptattrs: None,
            acl: None,
            identities: None,
            links: 1,
            xattr_dir: None,
        }
    }

    /// Returns the file bytes, if this is a file.
    pub fn file_data(&self) -> Option<&[u8]> {
        match &self.data {
            ObjectData::File(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns the directory entries, if this is a directory.
    pub fn entries(&self) -> Option<&BTreeMap<Vec<u8>, ObjectId>> {
        match &self.data {
            ObjectData::Directory(entries) => Some(entries),
            _ => None,
        }
    }
}

/// One recorded call into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum StoreCall {
    Contains(ObjectId),
    Lookup(ObjectId),
    Release(ObjectId),
    Create {
        parent: ObjectId,
        name: Vec<u8>,
        attrs: Vattr,
        flags: NameFlags,
        xoptattrs: Option<XoptAttrs>,
        acl: Option<AclSet>,
        identities: Option<IdentityContext>,
    },
    Mkdir {
        parent: ObjectId,
        name: Vec<u8>,
        attrs: Vattr,
        flags: NameFlags,
        xoptattrs: Option<XoptAttrs>,
        acl: Option<AclSet>,
        identities: Option<IdentityContext>,
    },
    MakeXattrDir {
        parent: ObjectId,
        attrs: Vattr,
        identities: Option<IdentityContext>,
    },
    Symlink {
        parent: ObjectId,
        name: Vec<u8>,
        target: Vec<u8>,
        attrs: Vattr,
        flags: NameFlags,
    },
    Remove {
        parent: ObjectId,
        name: Vec<u8>,
        flags: NameFlags,
    },
    Rmdir {
        parent: ObjectId,
        name: Vec<u8>,
        flags: NameFlags,
    },
    Link {
        parent: ObjectId,
        target: ObjectId,
        name: Vec<u8>,
        flags: NameFlags,
    },
    Rename {
        src_parent: ObjectId,
        src_name: Vec<u8>,
        dst_parent: ObjectId,
        dst_name: Vec<u8>,
        flags: NameFlags,
    },
    Write {
        object: ObjectId,
        offset: u64,
        data: Vec<u8>,
    },
    FreeRange {
        object: ObjectId,
        offset: u64,
        len: u64,
    },
    SetAttributes {
        object: ObjectId,
        attrs: Vattr,
        xoptattrs: Option<XoptAttrs>,
        identities: Option<IdentityContext>,
    },
    SetAcl {
        object: ObjectId,
        acl: AclSet,
        identities: Option<IdentityContext>,
    },
}

impl StoreCall {
    /// Returns true for calls that change the store.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::Contains(_) | Self::Lookup(_) | Self::Release(_)
        )
    }
}

#[derive(Debug, Default)]
struct State {
    objects: HashMap<ObjectId, StoredObject>,
    holds: HashMap<u64, ObjectId>,
    next_token: u64,
    calls: Vec<StoreCall>,
}

impl State {
    fn hold(&mut self, id: ObjectId) -> ObjectRef {
        self.next_token += 1;
        self.holds.insert(self.next_token, id);
        ObjectRef::new(id, self.next_token)
    }

    fn object(&self, id: ObjectId) -> StoreResult<&StoredObject> {
        self.objects.get(&id).ok_or(StoreError::not_found(id))
    }

    fn object_mut(&mut self, id: ObjectId) -> StoreResult<&mut StoredObject> {
        self.objects.get_mut(&id).ok_or(StoreError::not_found(id))
    }

    fn directory(&self, id: ObjectId) -> StoreResult<&BTreeMap<Vec<u8>, ObjectId>> {
        self.object(id)?
            .entries()
            .ok_or(StoreError::NotDirectory { id })
    }

    fn directory_mut(&mut self, id: ObjectId) -> StoreResult<&mut BTreeMap<Vec<u8>, ObjectId>> {
        match &mut self.object_mut(id)?.data {
            ObjectData::Directory(entries) => Ok(entries),
            _ => Err(StoreError::NotDirectory { id }),
        }
    }

    /// Finds the stored key matching `name` in directory `parent`.
    fn find_entry(
        &self,
        parent: ObjectId,
        name: &[u8],
        flags: NameFlags,
    ) -> StoreResult<Option<(Vec<u8>, ObjectId)>> {
        let entries = self.directory(parent)?;
        if let Some(id) = entries.get(name) {
            return Ok(Some((name.to_vec(), *id)));
        }
        if flags.case_insensitive {
            return Ok(entries
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(key, id)| (key.clone(), *id)));
        }
        Ok(None)
    }

    fn insert_new(
        &mut self,
        parent: ObjectId,
        name: &[u8],
        flags: NameFlags,
        object: StoredObject,
    ) -> StoreResult<ObjectRef> {
        let id = object.id;
        if self.objects.contains_key(&id) {
            return Err(StoreError::already_exists(id.to_string()));
        }
        if self.find_entry(parent, name, flags)?.is_some() {
            return Err(StoreError::already_exists(
                String::from_utf8_lossy(name).into_owned(),
            ));
        }
        self.directory_mut(parent)?.insert(name.to_vec(), id);
        self.objects.insert(id, object);
        Ok(self.hold(id))
    }

    fn unlink(&mut self, parent: ObjectId, name: &[u8], flags: NameFlags, dir: bool) -> StoreResult<()> {
        let (key, id) = self
            .find_entry(parent, name, flags)?
            .ok_or_else(|| StoreError::name_not_found(parent, name))?;
        let target = self.object(id)?;
        match (&target.data, dir) {
            (ObjectData::Directory(entries), true) if !entries.is_empty() => {
                return Err(StoreError::NotEmpty { id })
            }
            (ObjectData::Directory(_), false) => return Err(StoreError::IsDirectory { id }),
            (ObjectData::File(_) | ObjectData::Symlink(_), true) => {
                return Err(StoreError::NotDirectory { id })
            }
            _ => {}
        }
        self.directory_mut(parent)?.remove(&key);
        let target = self.object_mut(id)?;
        target.links = target.links.saturating_sub(1);
        if target.links == 0 {
            self.objects.remove(&id);
        }
        Ok(())
    }
}

/// An object store held entirely in memory.
///
/// Starts with a single root directory at [`ROOT_OBJECT_ID`]. Every call is
/// appended to a call log, including lookups and releases, and every
/// reference handed out is tracked until released.
///
/// # Example
///
/// ```rust
/// use zilreplay_store::{InMemoryObjectStore, ObjectId, ObjectStore, ROOT_OBJECT_ID};
///
/// let store = InMemoryObjectStore::new();
/// store.insert_file(ROOT_OBJECT_ID, b"a", ObjectId::new(10), b"hello").unwrap();
/// let file = store.lookup(ObjectId::new(10)).unwrap();
/// store.write(&file, 5, b" world").unwrap();
/// store.release(file);
/// assert_eq!(store.object(ObjectId::new(10)).unwrap().file_data(), Some(&b"hello world"[..]));
/// ```
#[derive(Debug)]
pub struct InMemoryObjectStore {
    state: RwLock<State>,
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryObjectStore {
    /// Creates a store holding only the root directory.
    #[must_use]
    pub fn new() -> Self {
        let mut state = State::default();
        let attrs = Vattr {
            kind: FileKind::Directory,
            mode: 0o755,
            nodeid: ROOT_OBJECT_ID,
            ..Vattr::default()
        };
        state.objects.insert(
            ROOT_OBJECT_ID,
            StoredObject::new(
                ROOT_OBJECT_ID,
                ObjectData::Directory(BTreeMap::new()),
                attrs,
            ),
        );
        Self {
            state: RwLock::new(state),
        }
    }

    /// Returns a copy of the object with the given id.
    #[must_use]
    pub fn object(&self, id: ObjectId) -> Option<StoredObject> {
        self.state.read().objects.get(&id).cloned()
    }

    /// Resolves `name` in directory `parent` without recording a call.
    #[must_use]
    pub fn lookup_name(&self, parent: ObjectId, name: &[u8]) -> Option<ObjectId> {
        let state = self.state.read();
        state.directory(parent).ok()?.get(name).copied()
    }

    /// Returns every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.read().calls.clone()
    }

    /// Returns only the calls that changed the store.
    #[must_use]
    pub fn mutations(&self) -> Vec<StoreCall> {
        self.state
            .read()
            .calls
            .iter()
            .filter(|call| call.is_mutation())
            .cloned()
            .collect()
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&self) {
        self.state.write().calls.clear();
    }

    /// Returns the number of references handed out and not yet released.
    #[must_use]
    pub fn outstanding_refs(&self) -> usize {
        self.state.read().holds.len()
    }

    /// Returns the number of objects, root included.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.state.read().objects.len()
    }

    /// Adds a file directly, bypassing the call log.
    pub fn insert_file(
        &self,
        parent: ObjectId,
        name: &[u8],
        id: ObjectId,
        contents: &[u8],
    ) -> StoreResult<()> {
        let attrs = Vattr {
            kind: FileKind::Regular,
            mode: 0o644,
            nodeid: id,
            size: contents.len() as u64,
            ..Vattr::default()
        };
        self.seed(
            parent,
            name,
            StoredObject::new(id, ObjectData::File(contents.to_vec()), attrs),
        )
    }

    /// Adds a directory directly, bypassing the call log.
    pub fn insert_directory(&self, parent: ObjectId, name: &[u8], id: ObjectId) -> StoreResult<()> {
        let attrs = Vattr {
            kind: FileKind::Directory,
            mode: 0o755,
            nodeid: id,
            ..Vattr::default()
        };
        self.seed(
            parent,
            name,
            StoredObject::new(id, ObjectData::Directory(BTreeMap::new()), attrs),
        )
    }

    fn seed(&self, parent: ObjectId, name: &[u8], object: StoredObject) -> StoreResult<()> {
        let mut state = self.state.write();
        let held = state.insert_new(parent, name, NameFlags::default(), object)?;
        state.holds.remove(&held.token());
        Ok(())
    }

    fn record(state: &mut State, call: StoreCall) {
        state.calls.push(call);
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn contains_object(&self, id: ObjectId) -> StoreResult<bool> {
        let mut state = self.state.write();
        Self::record(&mut state, StoreCall::Contains(id));
        Ok(state.objects.contains_key(&id))
    }

    fn lookup(&self, id: ObjectId) -> StoreResult<ObjectRef> {
        let mut state = self.state.write();
        Self::record(&mut state, StoreCall::Lookup(id));
        state.object(id)?;
        Ok(state.hold(id))
    }

    fn release(&self, object: ObjectRef) {
        let mut state = self.state.write();
        Self::record(&mut state, StoreCall::Release(object.id()));
        state.holds.remove(&object.token());
    }

    fn create(
        &self,
        parent: &ObjectRef,
        name: &[u8],
        attrs: &Vattr,
        options: &CreateOptions<'_>,
    ) -> StoreResult<ObjectRef> {
        let mut state = self.state.write();
        Self::record(
            &mut state,
            StoreCall::Create {
                parent: parent.id(),
                name: name.to_vec(),
                attrs: attrs.clone(),
                flags: options.flags,
                xoptattrs: options.xoptattrs.cloned(),
                acl: options.acl.cloned(),
                identities: options.identities.cloned(),
            },
        );
        let mut object = StoredObject::new(attrs.nodeid, ObjectData::File(Vec::new()), attrs.clone());
        object.xoptattrs = options.xoptattrs.cloned();
        object.acl = options.acl.cloned();
        object.identities = options.identities.cloned();
        state.insert_new(parent.id(), name, options.flags, object)
    }

    fn mkdir(
        &self,
        parent: &ObjectRef,
        name: &[u8],
        attrs: &Vattr,
        options: &CreateOptions<'_>,
    ) -> StoreResult<ObjectRef> {
        let mut state = self.state.write();
        Self::record(
            &mut state,
            StoreCall::Mkdir {
                parent: parent.id(),
                name: name.to_vec(),
                attrs: attrs.clone(),
                flags: options.flags,
                xoptattrs: options.xoptattrs.cloned(),
                acl: options.acl.cloned(),
                identities: options.identities.cloned(),
            },
        );
        let mut object = StoredObject::new(
            attrs.nodeid,
            ObjectData::Directory(BTreeMap::new()),
            attrs.clone(),
        );
        object.xoptattrs = options.xoptattrs.cloned();
        object.acl = options.acl.cloned();
        object.identities = options.identities.cloned();
        state.insert_new(parent.id(), name, options.flags, object)
    }

    fn make_xattr_dir(
        &self,
        parent: &ObjectRef,
        attrs: &Vattr,
        options: &CreateOptions<'_>,
    ) -> StoreResult<ObjectRef> {
        let mut state = self.state.write();
        Self::record(
            &mut state,
            StoreCall::MakeXattrDir {
                parent: parent.id(),
                attrs: attrs.clone(),
                identities: options.identities.cloned(),
            },
        );
        let id = attrs.nodeid;
        if state.objects.contains_key(&id) {
            return Err(StoreError::already_exists(id.to_string()));
        }
        let owner = state.object_mut(parent.id())?;
        if owner.xattr_dir.is_some() {
            return Err(StoreError::already_exists(format!(
                "xattr directory of {}",
                parent.id()
            )));
        }
        owner.xattr_dir = Some(id);
        let mut object = StoredObject::new(
            id,
            ObjectData::Directory(BTreeMap::new()),
            attrs.clone(),
        );
        object.identities = options.identities.cloned();
        state.objects.insert(id, object);
        Ok(state.hold(id))
    }

    fn symlink(
        &self,
        parent: &ObjectRef,
        name: &[u8],
        attrs: &Vattr,
        target: &[u8],
        options: &CreateOptions<'_>,
    ) -> StoreResult<ObjectRef> {
        let mut state = self.state.write();
        Self::record(
            &mut state,
            StoreCall::Symlink {
                parent: parent.id(),
                name: name.to_vec(),
                target: target.to_vec(),
                attrs: attrs.clone(),
                flags: options.flags,
            },
        );
        let mut attrs = attrs.clone();
        attrs.size = target.len() as u64;
        let mut object =
            StoredObject::new(attrs.nodeid, ObjectData::Symlink(target.to_vec()), attrs);
        object.identities = options.identities.cloned();
        state.insert_new(parent.id(), name, options.flags, object)
    }

    fn remove(&self, parent: &ObjectRef, name: &[u8], flags: NameFlags) -> StoreResult<()> {
        let mut state = self.state.write();
        Self::record(
            &mut state,
            StoreCall::Remove {
                parent: parent.id(),
                name: name.to_vec(),
                flags,
            },
        );
        state.unlink(parent.id(), name, flags, false)
    }

    fn rmdir(&self, parent: &ObjectRef, name: &[u8], flags: NameFlags) -> StoreResult<()> {
        let mut state = self.state.write();
        Self::record(
            &mut state,
            StoreCall::Rmdir {
                parent: parent.id(),
                name: name.to_vec(),
                flags,
            },
        );
        state.unlink(parent.id(), name, flags, true)
    }

    fn link(
        &self,
        parent: &ObjectRef,
        target: &ObjectRef,
        name: &[u8],
        flags: NameFlags,
    ) -> StoreResult<()> {
        let mut state = self.state.write();
        Self::record(
            &mut state,
            StoreCall::Link {
                parent: parent.id(),
                target: target.id(),
                name: name.to_vec(),
                flags,
            },
        );
        if let ObjectData::Directory(_) = state.object(target.id())?.data {
            return Err(StoreError::IsDirectory { id: target.id() });
        }
        if state.find_entry(parent.id(), name, flags)?.is_some() {
            return Err(StoreError::already_exists(
                String::from_utf8_lossy(name).into_owned(),
            ));
        }
        state.directory_mut(parent.id())?.insert(name.to_vec(), target.id());
        state.object_mut(target.id())?.links += 1;
        Ok(())
    }

    fn rename(
        &self,
        src_parent: &ObjectRef,
        src_name: &[u8],
        dst_parent: &ObjectRef,
        dst_name: &[u8],
        flags: NameFlags,
    ) -> StoreResult<()> {
        let mut state = self.state.write();
        Self::record(
            &mut state,
            StoreCall::Rename {
                src_parent: src_parent.id(),
                src_name: src_name.to_vec(),
                dst_parent: dst_parent.id(),
                dst_name: dst_name.to_vec(),
                flags,
            },
        );
        let (src_key, id) = state
            .find_entry(src_parent.id(), src_name, flags)?
            .ok_or_else(|| StoreError::name_not_found(src_parent.id(), src_name))?;
        state.directory(dst_parent.id())?;
        if let Some((dst_key, existing)) = state.find_entry(dst_parent.id(), dst_name, flags)? {
            if existing != id {
                state.unlink(dst_parent.id(), &dst_key, NameFlags::default(), false)?;
            } else {
                state.directory_mut(dst_parent.id())?.remove(&dst_key);
            }
        }
        state.directory_mut(src_parent.id())?.remove(&src_key);
        state
            .directory_mut(dst_parent.id())?
            .insert(dst_name.to_vec(), id);
        Ok(())
    }

    fn write(&self, object: &ObjectRef, offset: u64, data: &[u8]) -> StoreResult<()> {
        let mut state = self.state.write();
        Self::record(
            &mut state,
            StoreCall::Write {
                object: object.id(),
                offset,
                data: data.to_vec(),
            },
        );
        let id = object.id();
        let target = state.object_mut(id)?;
        let ObjectData::File(bytes) = &mut target.data else {
            return Err(StoreError::IsDirectory { id });
        };
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or_else(|| StoreError::unsupported("write offset"))?;
        let end = file_extent(end, "write end")?;
        let start = end - data.len();
        if bytes.len() < end {
            bytes.resize(end, 0);
        }
        bytes[start..end].copy_from_slice(data);
        target.attrs.size = bytes.len() as u64;
        Ok(())
    }

    fn free_range(&self, object: &ObjectRef, offset: u64, len: u64) -> StoreResult<()> {
        let mut state = self.state.write();
        Self::record(
            &mut state,
            StoreCall::FreeRange {
                object: object.id(),
                offset,
                len,
            },
        );
        let id = object.id();
        let target = state.object_mut(id)?;
        let ObjectData::File(bytes) = &mut target.data else {
            return Err(StoreError::IsDirectory { id });
        };
        if len == 0 {
            bytes.resize(file_extent(offset, "truncate offset")?, 0);
        } else if offset < bytes.len() as u64 {
            // Holes are clamped to the current size and never extend the file.
            let end = offset.saturating_add(len).min(bytes.len() as u64);
            bytes[offset as usize..end as usize].fill(0);
        }
        target.attrs.size = bytes.len() as u64;
        Ok(())
    }

    fn set_attributes(
        &self,
        object: &ObjectRef,
        attrs: &Vattr,
        xoptattrs: Option<&XoptAttrs>,
        identities: Option<&IdentityContext>,
    ) -> StoreResult<()> {
        use crate::attr::AttrMask;

        let mut state = self.state.write();
        Self::record(
            &mut state,
            StoreCall::SetAttributes {
                object: object.id(),
                attrs: attrs.clone(),
                xoptattrs: xoptattrs.cloned(),
                identities: identities.cloned(),
            },
        );
        let mask = attrs.mask;
        let new_len = if mask.contains(AttrMask::SIZE) {
            Some(file_extent(attrs.size, "file size")?)
        } else {
            None
        };
        let target = state.object_mut(object.id())?;
        if mask.contains(AttrMask::MODE) {
            target.attrs.mode = attrs.mode;
        }
        if mask.contains(AttrMask::UID) {
            target.attrs.owner = attrs.owner;
        }
        if mask.contains(AttrMask::GID) {
            target.attrs.group = attrs.group;
        }
        if mask.contains(AttrMask::ATIME) {
            target.attrs.atime = attrs.atime;
        }
        if mask.contains(AttrMask::MTIME) {
            target.attrs.mtime = attrs.mtime;
        }
        if let Some(len) = new_len {
            if let ObjectData::File(bytes) = &mut target.data {
                bytes.resize(len, 0);
            }
            target.attrs.size = attrs.size;
        }
        if let Some(xoptattrs) = xoptattrs {
            target.xoptattrs = Some(xoptattrs.clone());
        }
        if let Some(identities) = identities {
            target.identities = Some(identities.clone());
        }
        Ok(())
    }

    fn set_acl(
        &self,
        object: &ObjectRef,
        acl: &AclSet,
        identities: Option<&IdentityContext>,
    ) -> StoreResult<()> {
        let mut state = self.state.write();
        Self::record(
            &mut state,
            StoreCall::SetAcl {
                object: object.id(),
                acl: acl.clone(),
                identities: identities.cloned(),
            },
        );
        let target = state.object_mut(object.id())?;
        target.acl = Some(acl.clone());
        if let Some(identities) = identities {
            target.identities = Some(identities.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::AclEncoding;
    use crate::attr::AttrMask;
    use proptest::prelude::*;

    fn file_attrs(id: u64) -> Vattr {
        Vattr::new(
            AttrMask::TYPE | AttrMask::MODE,
            0o100_644,
            0,
            0,
            0,
            ObjectId::new(id),
        )
    }

    #[test]
    fn new_store_has_root() {
        let store = InMemoryObjectStore::new();
        assert_eq!(store.object_count(), 1);
        assert!(store.object(ROOT_OBJECT_ID).unwrap().entries().is_some());
        assert!(store.calls().is_empty());
    }

    #[test]
    fn lookup_missing_is_not_found() {
        let store = InMemoryObjectStore::new();
        let err = store.lookup(ObjectId::new(99)).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.outstanding_refs(), 0);
    }

    #[test]
    fn create_uses_logged_id() {
        let store = InMemoryObjectStore::new();
        let root = store.lookup(ROOT_OBJECT_ID).unwrap();
        let file = store
            .create(&root, b"foo", &file_attrs(20), &CreateOptions::default())
            .unwrap();
        assert_eq!(file.id(), ObjectId::new(20));
        store.release(file);
        store.release(root);
        assert_eq!(store.lookup_name(ROOT_OBJECT_ID, b"foo"), Some(ObjectId::new(20)));
        assert_eq!(store.outstanding_refs(), 0);
    }

    #[test]
    fn create_rejects_taken_id() {
        let store = InMemoryObjectStore::new();
        store.insert_file(ROOT_OBJECT_ID, b"a", ObjectId::new(20), b"").unwrap();
        let root = store.lookup(ROOT_OBJECT_ID).unwrap();
        let err = store
            .create(&root, b"b", &file_attrs(20), &CreateOptions::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
        store.release(root);
    }

    #[test]
    fn case_insensitive_remove() {
        let store = InMemoryObjectStore::new();
        store.insert_file(ROOT_OBJECT_ID, b"Foo.TXT", ObjectId::new(5), b"x").unwrap();
        let root = store.lookup(ROOT_OBJECT_ID).unwrap();
        assert!(store.remove(&root, b"foo.txt", NameFlags::default()).is_err());
        store
            .remove(&root, b"foo.txt", NameFlags::case_insensitive(true))
            .unwrap();
        store.release(root);
        assert!(store.object(ObjectId::new(5)).is_none());
    }

    #[test]
    fn rmdir_requires_empty_directory() {
        let store = InMemoryObjectStore::new();
        store.insert_directory(ROOT_OBJECT_ID, b"d", ObjectId::new(2)).unwrap();
        store.insert_file(ObjectId::new(2), b"f", ObjectId::new(3), b"").unwrap();
        let root = store.lookup(ROOT_OBJECT_ID).unwrap();
        let err = store.rmdir(&root, b"d", NameFlags::default()).unwrap_err();
        assert!(matches!(err, StoreError::NotEmpty { .. }));
        let err = store.remove(&root, b"d", NameFlags::default()).unwrap_err();
        assert!(matches!(err, StoreError::IsDirectory { .. }));
        store.release(root);
    }

    #[test]
    fn link_and_rename() {
        let store = InMemoryObjectStore::new();
        store.insert_file(ROOT_OBJECT_ID, b"a", ObjectId::new(7), b"").unwrap();
        let root = store.lookup(ROOT_OBJECT_ID).unwrap();
        let file = store.lookup(ObjectId::new(7)).unwrap();
        store.link(&root, &file, b"b", NameFlags::default()).unwrap();
        assert_eq!(store.object(ObjectId::new(7)).unwrap().links, 2);
        store
            .rename(&root, b"b", &root, b"c", NameFlags::default())
            .unwrap();
        assert_eq!(store.lookup_name(ROOT_OBJECT_ID, b"b"), None);
        assert_eq!(store.lookup_name(ROOT_OBJECT_ID, b"c"), Some(ObjectId::new(7)));
        store.remove(&root, b"a", NameFlags::default()).unwrap();
        assert!(store.object(ObjectId::new(7)).is_some());
        store.release(file);
        store.release(root);
    }

    #[test]
    fn write_extends_and_free_range_zeroes() {
        let store = InMemoryObjectStore::new();
        store.insert_file(ROOT_OBJECT_ID, b"f", ObjectId::new(4), b"abcdef").unwrap();
        let file = store.lookup(ObjectId::new(4)).unwrap();
        store.write(&file, 8, b"xy").unwrap();
        assert_eq!(
            store.object(ObjectId::new(4)).unwrap().file_data(),
            Some(&b"abcdef\0\0xy"[..])
        );
        store.free_range(&file, 1, 2).unwrap();
        assert_eq!(
            store.object(ObjectId::new(4)).unwrap().file_data(),
            Some(&b"a\0\0def\0\0xy"[..])
        );
        store.free_range(&file, 3, 0).unwrap();
        assert_eq!(store.object(ObjectId::new(4)).unwrap().attrs.size, 3);
        store.release(file);
    }

    #[test]
    fn set_attributes_honours_mask() {
        let store = InMemoryObjectStore::new();
        store.insert_file(ROOT_OBJECT_ID, b"f", ObjectId::new(4), b"").unwrap();
        let file = store.lookup(ObjectId::new(4)).unwrap();
        let mut attrs = Vattr::new(AttrMask::MODE, 0o600, 55, 66, 0, ObjectId::new(4));
        attrs.size = 100;
        store.set_attributes(&file, &attrs, None, None).unwrap();
        let stored = store.object(ObjectId::new(4)).unwrap();
        assert_eq!(stored.attrs.mode, 0o600);
        assert_eq!(stored.attrs.size, 0);
        assert_eq!(stored.attrs.owner, crate::IdentityRef::Resolved(0));
        store.release(file);
    }

    #[test]
    fn set_acl_replaces_list() {
        let store = InMemoryObjectStore::new();
        store.insert_file(ROOT_OBJECT_ID, b"f", ObjectId::new(4), b"").unwrap();
        let file = store.lookup(ObjectId::new(4)).unwrap();
        let acl = AclSet {
            encoding: AclEncoding::Current,
            entries: vec![crate::Ace::default()],
            flags: 0,
            byte_len: 12,
        };
        store.set_acl(&file, &acl, None).unwrap();
        assert_eq!(store.object(ObjectId::new(4)).unwrap().acl, Some(acl));
        store.release(file);
    }

    #[test]
    fn xattr_dir_is_attached_to_parent() {
        let store = InMemoryObjectStore::new();
        store.insert_file(ROOT_OBJECT_ID, b"f", ObjectId::new(4), b"").unwrap();
        let file = store.lookup(ObjectId::new(4)).unwrap();
        let dir = store
            .make_xattr_dir(&file, &file_attrs(9), &CreateOptions::default())
            .unwrap();
        assert_eq!(store.object(ObjectId::new(4)).unwrap().xattr_dir, Some(ObjectId::new(9)));
        store.release(dir);
        store.release(file);
        assert_eq!(store.outstanding_refs(), 0);
    }

    #[test]
    fn free_range_past_end_keeps_size() {
        let store = InMemoryObjectStore::new();
        store.insert_file(ROOT_OBJECT_ID, b"f", ObjectId::new(4), b"0123456789").unwrap();
        let file = store.lookup(ObjectId::new(4)).unwrap();

        store.free_range(&file, 20, 4).unwrap();
        assert_eq!(store.object(ObjectId::new(4)).unwrap().attrs.size, 10);

        store.free_range(&file, 8, 1 << 40).unwrap();
        let object = store.object(ObjectId::new(4)).unwrap();
        assert_eq!(object.file_data(), Some(&b"01234567\0\0"[..]));
        assert_eq!(object.attrs.size, 10);

        store.free_range(&file, 0, u64::MAX).unwrap();
        assert_eq!(store.object(ObjectId::new(4)).unwrap().file_data(), Some(&[0u8; 10][..]));
        store.release(file);
    }

    #[test]
    fn oversized_extents_are_refused() {
        let store = InMemoryObjectStore::new();
        store.insert_file(ROOT_OBJECT_ID, b"f", ObjectId::new(4), b"abc").unwrap();
        let file = store.lookup(ObjectId::new(4)).unwrap();

        let err = store.write(&file, 1 << 40, b"x").unwrap_err();
        assert!(matches!(err, StoreError::Unsupported { .. }));
        let err = store.write(&file, u64::MAX, b"x").unwrap_err();
        assert!(matches!(err, StoreError::Unsupported { .. }));
        let err = store.free_range(&file, MAX_FILE_SIZE + 1, 0).unwrap_err();
        assert!(matches!(err, StoreError::Unsupported { .. }));

        let mut attrs = file_attrs(4);
        attrs.mask = AttrMask::MODE | AttrMask::SIZE;
        attrs.mode = 0o600;
        attrs.size = 1 << 40;
        let err = store.set_attributes(&file, &attrs, None, None).unwrap_err();
        assert!(matches!(err, StoreError::Unsupported { .. }));

        let object = store.object(ObjectId::new(4)).unwrap();
        assert_eq!(object.file_data(), Some(&b"abc"[..]));
        assert_eq!(object.attrs.mode, 0o644);

        store.write(&file, MAX_FILE_SIZE - 1, b"x").unwrap();
        assert_eq!(store.object(ObjectId::new(4)).unwrap().attrs.size, MAX_FILE_SIZE);
        store.release(file);
    }

    proptest! {
        #[test]
        fn data_ops_match_a_plain_buffer(
            initial in prop::collection::vec(any::<u8>(), 0..64),
            ops in prop::collection::vec(
                (any::<bool>(), 0u64..128, 0u64..96, prop::collection::vec(any::<u8>(), 0..16)),
                0..24,
            ),
        ) {
            let store = InMemoryObjectStore::new();
            store.insert_file(ROOT_OBJECT_ID, b"f", ObjectId::new(4), &initial).unwrap();
            let file = store.lookup(ObjectId::new(4)).unwrap();
            let mut model = initial.clone();

            for (is_write, offset, len, data) in ops {
                let offset_usize = offset as usize;
                if is_write {
                    store.write(&file, offset, &data).unwrap();
                    let end = offset_usize + data.len();
                    if model.len() < end {
                        model.resize(end, 0);
                    }
                    model[offset_usize..end].copy_from_slice(&data);
                } else {
                    store.free_range(&file, offset, len).unwrap();
                    if len == 0 {
                        model.resize(offset_usize, 0);
                    } else if offset_usize < model.len() {
                        let end = (offset_usize + len as usize).min(model.len());
                        model[offset_usize..end].fill(0);
                    }
                }
                let object = store.object(ObjectId::new(4)).unwrap();
                prop_assert_eq!(object.file_data(), Some(&model[..]));
                prop_assert_eq!(object.attrs.size, model.len() as u64);
            }
            store.release(file);
        }
    }

    #[test]
    fn calls_are_recorded_in_order() {
        let store = InMemoryObjectStore::new();
        let root = store.lookup(ROOT_OBJECT_ID).unwrap();
        store.release(root);
        assert_eq!(
            store.calls(),
            vec![StoreCall::Lookup(ROOT_OBJECT_ID), StoreCall::Release(ROOT_OBJECT_ID)]
        );
        assert!(store.mutations().is_empty());
        store.clear_calls();
        assert!(store.calls().is_empty());
    }
}
