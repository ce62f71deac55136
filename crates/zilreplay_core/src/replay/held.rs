//! Scoped object references.

use zilreplay_store::{ObjectId, ObjectRef, ObjectStore, StoreResult};

/// An object reference that is handed back to its store when dropped.
///
/// Every lookup a handler performs goes through this guard, so references are
/// released on early returns and on `?` as well as on success.
pub(crate) struct Held<'s, S: ObjectStore + ?Sized> {
    store: &'s S,
    object: ObjectRef,
}

impl<'s, S: ObjectStore + ?Sized> Held<'s, S> {
    /// Looks up `id` and holds the result.
    pub(crate) fn lookup(store: &'s S, id: ObjectId) -> StoreResult<Self> {
        let object = store.lookup(id)?;
        Ok(Self { store, object })
    }

    pub(crate) fn get(&self) -> &ObjectRef {
        &self.object
    }
}

impl<S: ObjectStore + ?Sized> Drop for Held<'_, S> {
    fn drop(&mut self) {
        // The placeholder carries the same id and token and is never released.
        let placeholder = ObjectRef::new(self.object.id(), self.object.token());
        let object = std::mem::replace(&mut self.object, placeholder);
        self.store.release(object);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zilreplay_store::{InMemoryObjectStore, ROOT_OBJECT_ID};

    #[test]
    fn releases_on_drop() {
        let store = InMemoryObjectStore::new();
        {
            let held = Held::lookup(&store, ROOT_OBJECT_ID).unwrap();
            assert_eq!(held.get().id(), ROOT_OBJECT_ID);
            assert_eq!(store.outstanding_refs(), 1);
        }
        assert_eq!(store.outstanding_refs(), 0);
    }

    #[test]
    fn failed_lookup_holds_nothing() {
        let store = InMemoryObjectStore::new();
        assert!(Held::lookup(&store, ObjectId::new(999)).is_err());
        assert_eq!(store.outstanding_refs(), 0);
    }
}
