//! Interfaces to the surrounding database: document storage, index
//! access, cancellation and text normalization. The engine only ever
//! talks to these traits; `memory` provides the in-process reference
//! implementations.

mod lock;
mod memory;
mod notify;

pub use lock::{LockedDocuments, materialize_collection};
pub use memory::{MemoryIndex, MemoryStore, NodeRecord};
pub use notify::{DocumentEvent, NotificationService, Subscription, UpdateListener};

use std::borrow::Cow;
use std::time::{Duration, Instant};

use unicode_normalization::{IsNormalized, UnicodeNormalization, is_nfc_quick};

use crate::dom::{DocId, DocumentSet, NodeKind, NodeReference, NodeSet, QName};
use crate::error::{IndexError, LockError, QueryError};
use crate::query::Axis;

/// Collection identifier, assigned by the store.
pub type CollectionId = u32;

/// Collections holding engine-internal documents; never optimized
/// against, never required to carry user indexes.
pub const SYSTEM_COLLECTION: CollectionId = 0;

/// How an index lookup interprets the term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Case-insensitive whole-token equality.
    Exact,
    /// The term is a glob wildcard pattern.
    Regexp,
}

/// Value type an index stores for a set of nodes. Pattern lookups are
/// only sound against string-typed entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    String,
    Numeric,
    Untyped,
}

/// Read access to the full-text / value index.
pub trait IndexLookup {
    /// Nodes within `docs` whose indexed text contains `term`. When a
    /// `qname` is given, hits are attributed to the nearest enclosing
    /// node of that name; `axis` tells the index how candidates relate
    /// to the eventual context. A `context` set restricts hits to
    /// descendants-or-self of its members.
    fn lookup(
        &self,
        docs: &DocumentSet,
        context: Option<&NodeSet>,
        axis: Axis,
        qname: Option<&QName>,
        term: &str,
        mode: MatchMode,
    ) -> Result<NodeSet, IndexError>;

    /// Whether `collection` declares an index on `qname`.
    fn has_qname_index(&self, collection: CollectionId, qname: &QName) -> bool;

    /// The declared value type covering `nodes`.
    fn index_type_of(&self, nodes: &NodeSet) -> TypeTag;
}

/// Structural and textual access to stored documents.
pub trait DocumentStore {
    /// The distinct collections the given documents belong to.
    fn collections_of(&self, docs: &DocumentSet) -> Vec<CollectionId>;

    fn documents_in(&self, collection: CollectionId) -> Vec<DocId>;

    /// All nodes named `name` of the given kind, across `docs`, in
    /// document order.
    fn nodes_named(&self, docs: &DocumentSet, name: &QName, kind: NodeKind) -> NodeSet;

    /// All nodes of the given kind across `docs`.
    fn nodes_of_kind(&self, docs: &DocumentSet, kind: NodeKind) -> NodeSet;

    fn node_name(&self, node: &NodeReference) -> Option<QName>;

    /// Atomized string value: the node's own text, or for elements the
    /// concatenated text of their descendants.
    fn node_text(&self, node: &NodeReference) -> Option<String>;

    fn acquire_read_lock(&self, doc: DocId) -> Result<(), LockError>;

    fn release_read_lock(&self, doc: DocId);

    /// Whether the calling execution already holds a lock on `doc`.
    fn has_lock(&self, doc: DocId) -> bool;
}

/// Cooperative cancellation. Checked between candidate nodes.
pub trait QueryWatchdog {
    fn checkpoint(&self) -> Result<(), QueryError>;
}

/// Watchdog that never cancels.
#[derive(Debug, Default)]
pub struct UnlimitedWatchdog;

impl QueryWatchdog for UnlimitedWatchdog {
    fn checkpoint(&self) -> Result<(), QueryError> {
        Ok(())
    }
}

/// Cancels once a wall-clock budget is spent.
#[derive(Debug)]
pub struct TimeoutWatchdog {
    deadline: Instant,
}

impl TimeoutWatchdog {
    pub fn with_budget(budget: Duration) -> Self {
        Self {
            deadline: Instant::now() + budget,
        }
    }
}

impl QueryWatchdog for TimeoutWatchdog {
    fn checkpoint(&self) -> Result<(), QueryError> {
        if Instant::now() > self.deadline {
            return Err(QueryError::Cancelled("query time budget exhausted".into()));
        }
        Ok(())
    }
}

/// Optional text normalization applied to node text before scanning.
/// Query terms are expected to arrive already normalized.
pub trait TextNormalizer {
    fn normalize<'a>(&self, text: &'a str) -> Cow<'a, str>;
}

/// Normalization form C.
#[derive(Debug, Default)]
pub struct NfcNormalizer;

impl TextNormalizer for NfcNormalizer {
    fn normalize<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if is_nfc_quick(text.chars()) == IsNormalized::Yes {
            Cow::Borrowed(text)
        } else {
            Cow::Owned(text.nfc().collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_watchdog_cancels() {
        let wd = TimeoutWatchdog::with_budget(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(2));
        assert!(matches!(wd.checkpoint(), Err(QueryError::Cancelled(_))));
        assert!(UnlimitedWatchdog.checkpoint().is_ok());
    }

    #[test]
    fn nfc_normalizer_composes() {
        let n = NfcNormalizer;
        // "e" + combining acute accent composes to a single scalar
        let decomposed = "e\u{301}te\u{301}";
        assert_eq!(n.normalize(decomposed), "été");
        assert!(matches!(n.normalize("plain"), Cow::Borrowed(_)));
    }
}
