//! Read-locked materialization of collection contents.

use tracing::warn;

use crate::dom::{DocId, NodeId, NodeKind, NodeReference, NodeSet};

use super::{CollectionId, DocumentStore};

/// Documents whose read locks were handed to the caller instead of being
/// released. One instance per query; release it when the query is done.
#[derive(Debug, Default)]
pub struct LockedDocuments {
    docs: Vec<DocId>,
}

impl LockedDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn contains(&self, doc: DocId) -> bool {
        self.docs.contains(&doc)
    }

    /// Releases every retained lock.
    pub fn release(&mut self, store: &dyn DocumentStore) {
        for doc in self.docs.drain(..) {
            store.release_read_lock(doc);
        }
    }
}

/// Builds the node set of a collection's document roots, read-locking
/// each document while it is touched.
///
/// A document whose lock cannot be acquired is skipped with a warning;
/// the query proceeds over the rest. When `retain` is given, acquired
/// locks are handed over instead of released, and documents already
/// locked by this execution are not locked again.
pub fn materialize_collection(
    store: &dyn DocumentStore,
    collection: CollectionId,
    retain: Option<&mut LockedDocuments>,
) -> NodeSet {
    let mut result = NodeSet::new();
    let mut retained = retain;
    for doc in store.documents_in(collection) {
        let already_held = store.has_lock(doc)
            || retained.as_ref().is_some_and(|held| held.contains(doc));
        if !already_held {
            if let Err(err) = store.acquire_read_lock(doc) {
                warn!(doc, %err, "skipping document, read lock unavailable");
                continue;
            }
        }
        result.add(NodeReference::new(doc, NodeId::root(), NodeKind::Element));
        if already_held {
            continue;
        }
        match retained.as_deref_mut() {
            Some(held) => held.docs.push(doc),
            None => store.release_read_lock(doc),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn store_with_docs() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert_document(1, 10, Vec::new());
        store.insert_document(1, 11, Vec::new());
        store.insert_document(2, 20, Vec::new());
        store
    }

    #[test]
    fn materializes_collection_roots() {
        let store = store_with_docs();
        let set = materialize_collection(&store, 1, None);
        assert_eq!(set.len(), 2);
        assert!(set.contains_id(10, &NodeId::root()));
        assert!(set.contains_id(11, &NodeId::root()));
        // transient locks were all released
        assert_eq!(store.active_lock_count(), 0);
    }

    #[test]
    fn failed_lock_skips_document() {
        let store = store_with_docs();
        store.poison_lock(10);
        let set = materialize_collection(&store, 1, None);
        assert_eq!(set.len(), 1);
        assert!(set.contains_id(11, &NodeId::root()));
    }

    #[test]
    fn retained_locks_are_handed_over() {
        let store = store_with_docs();
        let mut held = LockedDocuments::new();
        let set = materialize_collection(&store, 1, Some(&mut held));
        assert_eq!(set.len(), 2);
        assert_eq!(held.len(), 2);
        assert_eq!(store.active_lock_count(), 2);

        // a second materialization must not double-lock
        let again = materialize_collection(&store, 1, Some(&mut held));
        assert_eq!(again.len(), 2);
        assert_eq!(held.len(), 2);

        held.release(&store);
        assert_eq!(store.active_lock_count(), 0);
    }
}
