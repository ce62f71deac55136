//! One handler per mutation kind.
//!
//! Handlers take an already decoded record, resolve the objects it names and
//! call the matching store primitive. Every reference they take is a
//! [`Held`] guard, so it is released on every exit path.
//!
//! Two lookup policies apply. Parents of name-based operations, and both
//! ends of a link or rename, must exist: a failed lookup is returned as is.
//! The target of a write, truncate, setattr or ACL record may already be gone
//! because a later removal was applied first; that lookup failure is reported
//! as [`ReplayOutcome::TargetMissing`].

use tracing::{debug, warn};
use zilreplay_store::{
    AclSet, CreateOptions, IdentityContext, NameFlags, ObjectId, ObjectStore, Vattr, XoptAttrs,
};

use super::held::Held;
use super::ReplayOutcome;
use crate::error::ReplayResult;
use crate::record::{CreateKind, CreateRecord};

fn non_empty(identities: &IdentityContext) -> Option<&IdentityContext> {
    (!identities.is_empty()).then_some(identities)
}

/// Looks up the target of a record that tolerates a missing object.
fn lookup_target<S: ObjectStore + ?Sized>(
    store: &S,
    id: ObjectId,
) -> ReplayResult<Option<Held<'_, S>>> {
    match Held::lookup(store, id) {
        Ok(held) => Ok(Some(held)),
        Err(err) if err.is_not_found() => {
            warn!(object = %id, "target object is gone, skipping record");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

pub(super) fn create<S: ObjectStore + ?Sized>(
    store: &S,
    record: &CreateRecord<'_>,
    flags: NameFlags,
) -> ReplayResult<ReplayOutcome> {
    let parent = Held::lookup(store, record.parent)?;
    if store.contains_object(record.object)? {
        warn!(
            object = %record.object,
            parent = %record.parent,
            "object already exists, skipping create"
        );
        return Ok(ReplayOutcome::AlreadyApplied);
    }

    let options = CreateOptions {
        flags,
        xoptattrs: record.xoptattrs.as_ref(),
        acl: record.acl.as_ref(),
        identities: non_empty(&record.identities),
    };
    let created = match &record.kind {
        CreateKind::File => store.create(parent.get(), record.name, &record.attrs, &options)?,
        CreateKind::Directory => store.mkdir(parent.get(), record.name, &record.attrs, &options)?,
        CreateKind::XattrDir => store.make_xattr_dir(parent.get(), &record.attrs, &options)?,
        CreateKind::Symlink { target } => {
            store.symlink(parent.get(), record.name, &record.attrs, target, &options)?
        }
    };
    debug!(object = %created.id(), parent = %record.parent, "created object");
    store.release(created);
    Ok(ReplayOutcome::Applied)
}

pub(super) fn remove<S: ObjectStore + ?Sized>(
    store: &S,
    parent: ObjectId,
    name: &[u8],
    directory: bool,
    flags: NameFlags,
) -> ReplayResult<ReplayOutcome> {
    let parent = Held::lookup(store, parent)?;
    if directory {
        store.rmdir(parent.get(), name, flags)?;
    } else {
        store.remove(parent.get(), name, flags)?;
    }
    Ok(ReplayOutcome::Applied)
}

pub(super) fn link<S: ObjectStore + ?Sized>(
    store: &S,
    parent: ObjectId,
    target: ObjectId,
    name: &[u8],
    flags: NameFlags,
) -> ReplayResult<ReplayOutcome> {
    let parent = Held::lookup(store, parent)?;
    let target = Held::lookup(store, target)?;
    store.link(parent.get(), target.get(), name, flags)?;
    Ok(ReplayOutcome::Applied)
}

pub(super) fn rename<S: ObjectStore + ?Sized>(
    store: &S,
    src_parent: ObjectId,
    src_name: &[u8],
    dst_parent: ObjectId,
    dst_name: &[u8],
    flags: NameFlags,
) -> ReplayResult<ReplayOutcome> {
    let src = Held::lookup(store, src_parent)?;
    let dst = Held::lookup(store, dst_parent)?;
    store.rename(src.get(), src_name, dst.get(), dst_name, flags)?;
    Ok(ReplayOutcome::Applied)
}

pub(super) fn write<S: ObjectStore + ?Sized>(
    store: &S,
    object: ObjectId,
    offset: u64,
    data: &[u8],
) -> ReplayResult<ReplayOutcome> {
    let Some(target) = lookup_target(store, object)? else {
        return Ok(ReplayOutcome::TargetMissing);
    };
    store.write(target.get(), offset, data)?;
    Ok(ReplayOutcome::Applied)
}

pub(super) fn truncate<S: ObjectStore + ?Sized>(
    store: &S,
    object: ObjectId,
    offset: u64,
    length: u64,
) -> ReplayResult<ReplayOutcome> {
    let Some(target) = lookup_target(store, object)? else {
        return Ok(ReplayOutcome::TargetMissing);
    };
    store.free_range(target.get(), offset, length)?;
    Ok(ReplayOutcome::Applied)
}

pub(super) fn set_attributes<S: ObjectStore + ?Sized>(
    store: &S,
    object: ObjectId,
    attrs: &Vattr,
    xoptattrs: Option<&XoptAttrs>,
    identities: &IdentityContext,
) -> ReplayResult<ReplayOutcome> {
    let Some(target) = lookup_target(store, object)? else {
        return Ok(ReplayOutcome::TargetMissing);
    };
    store.set_attributes(target.get(), attrs, xoptattrs, non_empty(identities))?;
    Ok(ReplayOutcome::Applied)
}

pub(super) fn set_acl<S: ObjectStore + ?Sized>(
    store: &S,
    object: ObjectId,
    acl: &AclSet,
    identities: &IdentityContext,
) -> ReplayResult<ReplayOutcome> {
    let Some(target) = lookup_target(store, object)? else {
        return Ok(ReplayOutcome::TargetMissing);
    };
    store.set_acl(target.get(), acl, non_empty(identities))?;
    Ok(ReplayOutcome::Applied)
}
