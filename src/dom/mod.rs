//! Node identities and match records.
//!
//! A node is identified by its document id plus a hierarchical [`NodeId`],
//! a sequence of sibling ordinals from the document element down. The
//! derived lexicographic order over the components is document order, and
//! ancestry is a proper-prefix test, so all set algebra and structural
//! correlation works on the ids alone without touching the store.

mod document_set;
mod node_set;

pub use document_set::DocumentSet;
pub use node_set::{NodeHit, NodeSet};

use std::fmt;

use smallvec::SmallVec;

/// Document identifier, assigned by the store.
pub type DocId = u32;

/// Identifies the query (sub)expression a [`Match`] originates from.
pub type ExpressionId = u32;

/// The node kinds that can carry or anchor full-text content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Element,
    Attribute,
    Text,
}

/// Expanded name of an element or attribute.
///
/// Namespace resolution happens outside this crate; the URI arrives here
/// already resolved (or absent for no-namespace names).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    pub namespace: Option<Box<str>>,
    pub local: Box<str>,
}

impl QName {
    /// A name in no namespace.
    pub fn local(name: &str) -> Self {
        Self {
            namespace: None,
            local: name.into(),
        }
    }

    pub fn namespaced(namespace: &str, local: &str) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local: local.into(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{ns}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// Hierarchical node identifier: one sibling ordinal per tree level,
/// starting at the document element.
///
/// Invariants exploited throughout the crate:
/// - lexicographic component order == document order
/// - `a` is an ancestor of `b` iff `a`'s components are a proper prefix
///   of `b`'s
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(SmallVec<[u32; 4]>);

impl NodeId {
    /// The document element, `[1]`.
    pub fn root() -> Self {
        Self(SmallVec::from_slice(&[1]))
    }

    pub fn from_components(components: &[u32]) -> Self {
        debug_assert!(!components.is_empty());
        Self(SmallVec::from_slice(components))
    }

    pub fn components(&self) -> &[u32] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// The `ordinal`-th child of this node (1-based).
    pub fn child(&self, ordinal: u32) -> Self {
        let mut components = self.0.clone();
        components.push(ordinal);
        Self(components)
    }

    /// `None` for the document element.
    pub fn parent(&self) -> Option<Self> {
        if self.0.len() <= 1 {
            return None;
        }
        Some(Self(SmallVec::from_slice(&self.0[..self.0.len() - 1])))
    }

    /// Proper-prefix test; a node is not its own ancestor.
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.0.len() < other.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    pub fn is_ancestor_or_self_of(&self, other: &Self) -> bool {
        self == other || self.is_ancestor_of(other)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for c in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{c}")?;
            first = false;
        }
        Ok(())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A node in a document: the unit node sets are built from.
///
/// Ordering (and thus set identity) is by `(doc, node)`; the kind is
/// payload. Node ids are unique within a document across kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeReference {
    pub doc: DocId,
    pub node: NodeId,
    pub kind: NodeKind,
}

impl NodeReference {
    pub fn new(doc: DocId, node: NodeId, kind: NodeKind) -> Self {
        Self { doc, node, kind }
    }

    pub fn element(doc: DocId, components: &[u32]) -> Self {
        Self::new(doc, NodeId::from_components(components), NodeKind::Element)
    }
}

impl PartialOrd for NodeReference {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeReference {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.doc, &self.node).cmp(&(other.doc, &other.node))
    }
}

/// One full-text hit inside a node's string value.
///
/// Offsets are byte offsets into the atomized (and, when a normalizer is
/// installed, normalized) text of the node the hit is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub expression: ExpressionId,
    pub offset: u32,
    pub length: u32,
}

impl Match {
    pub fn new(expression: ExpressionId, offset: u32, length: u32) -> Self {
        Self {
            expression,
            offset,
            length,
        }
    }
}
