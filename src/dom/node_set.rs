//! Ordered node sets and their merge-based algebra.

use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use super::{DocId, DocumentSet, Match, NodeId, NodeReference};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

fn next_token() -> u64 {
    NEXT_TOKEN.fetch_add(1, Ordering::Relaxed)
}

/// A member of a [`NodeSet`]: the node plus the full-text matches
/// attributed to it so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHit {
    pub reference: NodeReference,
    pub matches: SmallVec<[Match; 2]>,
}

impl NodeHit {
    pub fn new(reference: NodeReference) -> Self {
        Self {
            reference,
            matches: SmallVec::new(),
        }
    }

    pub fn with_match(reference: NodeReference, m: Match) -> Self {
        let mut matches = SmallVec::new();
        matches.push(m);
        Self { reference, matches }
    }

    fn key(&self) -> (DocId, &NodeId) {
        (self.reference.doc, &self.reference.node)
    }

    /// Appends `other`'s matches, skipping exact duplicates.
    pub fn merge_matches(&mut self, other: &NodeHit) {
        for m in &other.matches {
            if !self.matches.contains(m) {
                self.matches.push(*m);
            }
        }
    }
}

/// A sorted, duplicate-free set of nodes in document order.
///
/// Membership is keyed by `(doc, node)`. Every set carries an identity
/// token drawn from a global counter; any mutation replaces the token, so
/// equal tokens mean "the very same value nothing has touched since". The
/// result cache keys on it.
#[derive(Debug, Clone)]
pub struct NodeSet {
    hits: Vec<NodeHit>,
    token: u64,
}

impl Default for NodeSet {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeSet {
    pub fn new() -> Self {
        Self {
            hits: Vec::new(),
            token: next_token(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            hits: Vec::with_capacity(capacity),
            token: next_token(),
        }
    }

    /// Wraps a vector already sorted by `(doc, node)` with no duplicates.
    fn from_sorted(hits: Vec<NodeHit>) -> Self {
        debug_assert!(hits.windows(2).all(|w| w[0].key() < w[1].key()));
        Self {
            hits,
            token: next_token(),
        }
    }

    pub fn single(reference: NodeReference) -> Self {
        Self::from_sorted(vec![NodeHit::new(reference)])
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Identity token; see the type docs.
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeHit> {
        self.hits.iter()
    }

    pub fn get(&self, index: usize) -> Option<&NodeHit> {
        self.hits.get(index)
    }

    fn position_of(&self, doc: DocId, node: &NodeId) -> Option<usize> {
        self.hits
            .binary_search_by(|h| h.key().cmp(&(doc, node)))
            .ok()
    }

    pub fn contains(&self, reference: &NodeReference) -> bool {
        self.contains_id(reference.doc, &reference.node)
    }

    pub fn contains_id(&self, doc: DocId, node: &NodeId) -> bool {
        self.position_of(doc, node).is_some()
    }

    pub fn find(&self, doc: DocId, node: &NodeId) -> Option<&NodeHit> {
        self.position_of(doc, node).map(|i| &self.hits[i])
    }

    /// Inserts a node, merging matches if it is already present.
    pub fn add_hit(&mut self, hit: NodeHit) {
        match self
            .hits
            .binary_search_by(|h| h.key().cmp(&hit.key()))
        {
            Ok(i) => self.hits[i].merge_matches(&hit),
            Err(i) => self.hits.insert(i, hit),
        }
        self.token = next_token();
    }

    pub fn add(&mut self, reference: NodeReference) {
        self.add_hit(NodeHit::new(reference));
    }

    pub fn add_match(&mut self, reference: NodeReference, m: Match) {
        self.add_hit(NodeHit::with_match(reference, m));
    }

    /// The documents the members live in.
    pub fn document_set(&self) -> DocumentSet {
        let mut docs = DocumentSet::new();
        for hit in &self.hits {
            docs.insert(hit.reference.doc);
        }
        docs
    }

    /// Nearest ancestor of `node` (or `node` itself when `include_self`)
    /// that is a member of this set. With `direct_parent`, only the
    /// immediate parent qualifies.
    pub fn parent_with_child(
        &self,
        doc: DocId,
        node: &NodeId,
        direct_parent: bool,
        include_self: bool,
    ) -> Option<&NodeHit> {
        if include_self
            && let Some(i) = self.position_of(doc, node)
        {
            return Some(&self.hits[i]);
        }
        let mut current = node.parent();
        while let Some(id) = current {
            if let Some(i) = self.position_of(doc, &id) {
                return Some(&self.hits[i]);
            }
            if direct_parent {
                return None;
            }
            current = id.parent();
        }
        None
    }

    /// Set union; matches of nodes present on both sides are merged.
    pub fn union(&self, other: &NodeSet) -> NodeSet {
        let mut out = Vec::with_capacity(self.hits.len() + other.hits.len());
        let (mut i, mut j) = (0, 0);
        while i < self.hits.len() && j < other.hits.len() {
            match self.hits[i].key().cmp(&other.hits[j].key()) {
                std::cmp::Ordering::Less => {
                    out.push(self.hits[i].clone());
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    out.push(other.hits[j].clone());
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    let mut merged = self.hits[i].clone();
                    merged.merge_matches(&other.hits[j]);
                    out.push(merged);
                    i += 1;
                    j += 1;
                }
            }
        }
        out.extend_from_slice(&self.hits[i..]);
        out.extend_from_slice(&other.hits[j..]);
        NodeSet::from_sorted(out)
    }

    /// Nodes present in both sets (by identity), with matches from both
    /// sides merged.
    pub fn intersection(&self, other: &NodeSet) -> NodeSet {
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.hits.len() && j < other.hits.len() {
            match self.hits[i].key().cmp(&other.hits[j].key()) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    let mut merged = self.hits[i].clone();
                    merged.merge_matches(&other.hits[j]);
                    out.push(merged);
                    i += 1;
                    j += 1;
                }
            }
        }
        NodeSet::from_sorted(out)
    }

    /// Ancestor-correlated intersection.
    ///
    /// A pair of nodes correlates when one is the other (identity) or an
    /// ancestor of the other. For every correlated pair the ANCESTOR is
    /// kept and the descendant's matches are merged into it.
    pub fn deep_intersection(&self, other: &NodeSet) -> NodeSet {
        let mut result = NodeSet::new();
        for hit in &self.hits {
            if let Some(anc) = other.parent_with_child(hit.reference.doc, &hit.reference.node, false, true)
            {
                let mut merged = anc.clone();
                merged.merge_matches(hit);
                result.add_hit(merged);
            }
        }
        for hit in &other.hits {
            if let Some(anc) = self.parent_with_child(hit.reference.doc, &hit.reference.node, false, true)
            {
                let mut merged = anc.clone();
                merged.merge_matches(hit);
                result.add_hit(merged);
            }
        }
        result
    }

    /// Nodes of this set not present (by identity) in `other`.
    pub fn except(&self, other: &NodeSet) -> NodeSet {
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.hits.len() && j < other.hits.len() {
            match self.hits[i].key().cmp(&other.hits[j].key()) {
                std::cmp::Ordering::Less => {
                    out.push(self.hits[i].clone());
                    i += 1;
                }
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
            }
        }
        out.extend_from_slice(&self.hits[i..]);
        NodeSet::from_sorted(out)
    }

    /// Members whose direct parent is in `parents`.
    pub fn children_of(&self, parents: &NodeSet) -> NodeSet {
        let hits = self
            .hits
            .iter()
            .filter(|h| {
                h.reference
                    .node
                    .parent()
                    .is_some_and(|p| parents.contains_id(h.reference.doc, &p))
            })
            .cloned()
            .collect();
        NodeSet::from_sorted(hits)
    }

    /// Members with an ancestor (or, when `include_self`, themselves) in
    /// `ancestors`.
    pub fn descendants_of(&self, ancestors: &NodeSet, include_self: bool) -> NodeSet {
        let hits = self
            .hits
            .iter()
            .filter(|h| {
                ancestors
                    .parent_with_child(h.reference.doc, &h.reference.node, false, include_self)
                    .is_some()
            })
            .cloned()
            .collect();
        NodeSet::from_sorted(hits)
    }
}

impl FromIterator<NodeReference> for NodeSet {
    fn from_iter<T: IntoIterator<Item = NodeReference>>(iter: T) -> Self {
        let mut set = NodeSet::new();
        for r in iter {
            set.add(r);
        }
        set
    }
}

impl PartialEq for NodeSet {
    fn eq(&self, other: &Self) -> bool {
        self.hits == other.hits
    }
}

impl Eq for NodeSet {}
