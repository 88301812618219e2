//! In-memory reference implementations of the store and index traits.
//!
//! Small and unoptimized on purpose; they exist so the engine can be
//! exercised end to end (and so embedders have a template for wiring
//! their own store).

use parking_lot::Mutex;
use regex::RegexBuilder;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::dom::{DocId, DocumentSet, Match, NodeId, NodeKind, NodeReference, NodeSet, QName};
use crate::error::{IndexError, LockError};
use crate::query::Axis;
use crate::text::{Tokenizer, WordTokenizer, glob_to_regex};

use super::{CollectionId, DocumentStore, IndexLookup, MatchMode, TypeTag};

/// One stored node. Elements may carry direct text; their atomized value
/// is the direct text followed by all descendant text nodes.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: Option<QName>,
    pub text: Option<String>,
}

impl NodeRecord {
    pub fn element(id: &[u32], name: &str) -> Self {
        Self {
            id: NodeId::from_components(id),
            kind: NodeKind::Element,
            name: Some(QName::local(name)),
            text: None,
        }
    }

    pub fn element_with_text(id: &[u32], name: &str, text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::element(id, name)
        }
    }

    pub fn text(id: &[u32], content: &str) -> Self {
        Self {
            id: NodeId::from_components(id),
            kind: NodeKind::Text,
            name: None,
            text: Some(content.to_string()),
        }
    }

    pub fn attribute(id: &[u32], name: &str, value: &str) -> Self {
        Self {
            id: NodeId::from_components(id),
            kind: NodeKind::Attribute,
            name: Some(QName::local(name)),
            text: Some(value.to_string()),
        }
    }
}

#[derive(Debug)]
struct DocumentRecord {
    collection: CollectionId,
    /// Sorted by node id.
    nodes: Vec<NodeRecord>,
}

/// In-memory [`DocumentStore`].
#[derive(Default)]
pub struct MemoryStore {
    collections: FxHashMap<CollectionId, Vec<DocId>>,
    docs: FxHashMap<DocId, DocumentRecord>,
    locks: Mutex<FxHashMap<DocId, u32>>,
    poisoned: Mutex<FxHashSet<DocId>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_document(
        &mut self,
        collection: CollectionId,
        doc: DocId,
        mut nodes: Vec<NodeRecord>,
    ) {
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        self.docs.insert(doc, DocumentRecord { collection, nodes });
        let docs = self.collections.entry(collection).or_default();
        if let Err(i) = docs.binary_search(&doc) {
            docs.insert(i, doc);
        }
    }

    /// Makes every future lock attempt on `doc` fail.
    pub fn poison_lock(&self, doc: DocId) {
        self.poisoned.lock().insert(doc);
    }

    pub fn active_lock_count(&self) -> usize {
        self.locks.lock().values().filter(|&&c| c > 0).count()
    }

    fn record(&self, doc: DocId, node: &NodeId) -> Option<&NodeRecord> {
        let rec = self.docs.get(&doc)?;
        rec.nodes
            .binary_search_by(|n| n.id.cmp(node))
            .ok()
            .map(|i| &rec.nodes[i])
    }
}

impl DocumentStore for MemoryStore {
    fn collections_of(&self, docs: &DocumentSet) -> Vec<CollectionId> {
        let mut out: Vec<CollectionId> = docs
            .iter()
            .filter_map(|d| self.docs.get(&d).map(|r| r.collection))
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    fn documents_in(&self, collection: CollectionId) -> Vec<DocId> {
        self.collections.get(&collection).cloned().unwrap_or_default()
    }

    fn nodes_named(&self, docs: &DocumentSet, name: &QName, kind: NodeKind) -> NodeSet {
        let mut result = NodeSet::new();
        for doc in docs.iter() {
            let Some(rec) = self.docs.get(&doc) else {
                continue;
            };
            for node in &rec.nodes {
                if node.kind == kind && node.name.as_ref() == Some(name) {
                    result.add(NodeReference::new(doc, node.id.clone(), kind));
                }
            }
        }
        result
    }

    fn nodes_of_kind(&self, docs: &DocumentSet, kind: NodeKind) -> NodeSet {
        let mut result = NodeSet::new();
        for doc in docs.iter() {
            let Some(rec) = self.docs.get(&doc) else {
                continue;
            };
            for node in &rec.nodes {
                if node.kind == kind {
                    result.add(NodeReference::new(doc, node.id.clone(), kind));
                }
            }
        }
        result
    }

    fn node_name(&self, node: &NodeReference) -> Option<QName> {
        self.record(node.doc, &node.node)?.name.clone()
    }

    fn node_text(&self, node: &NodeReference) -> Option<String> {
        let rec = self.record(node.doc, &node.node)?;
        match rec.kind {
            NodeKind::Text | NodeKind::Attribute => rec.text.clone(),
            NodeKind::Element => {
                let doc = self.docs.get(&node.doc)?;
                let mut parts: Vec<&str> = Vec::new();
                if let Some(own) = &rec.text {
                    parts.push(own);
                }
                for n in &doc.nodes {
                    if n.kind == NodeKind::Text
                        && node.node.is_ancestor_of(&n.id)
                        && let Some(t) = &n.text
                    {
                        parts.push(t);
                    }
                }
                Some(parts.join(" "))
            }
        }
    }

    fn acquire_read_lock(&self, doc: DocId) -> Result<(), LockError> {
        if self.poisoned.lock().contains(&doc) {
            return Err(LockError {
                doc,
                reason: "lock table poisoned".into(),
            });
        }
        *self.locks.lock().entry(doc).or_insert(0) += 1;
        Ok(())
    }

    fn release_read_lock(&self, doc: DocId) {
        let mut locks = self.locks.lock();
        if let Some(count) = locks.get_mut(&doc) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                locks.remove(&doc);
            }
        }
    }

    fn has_lock(&self, doc: DocId) -> bool {
        self.locks.lock().get(&doc).copied().unwrap_or(0) > 0
    }
}

#[derive(Debug, Clone)]
struct Posting {
    doc: DocId,
    node: NodeId,
    kind: NodeKind,
    offset: u32,
    length: u32,
}

/// In-memory inverted index over a [`MemoryStore`] snapshot.
///
/// Index-originated [`Match`] records carry expression id 0; the scan
/// paths attribute matches to the querying expression instead.
pub struct MemoryIndex {
    /// Lowercased token -> postings.
    postings: FxHashMap<String, Vec<Posting>>,
    /// Per document: named nodes, sorted by id.
    names: FxHashMap<DocId, Vec<(NodeId, NodeKind, QName)>>,
    qname_indexes: FxHashMap<CollectionId, Vec<QName>>,
    type_tag: TypeTag,
}

impl MemoryIndex {
    /// Indexes every text-bearing node of the store.
    pub fn build(store: &MemoryStore) -> Self {
        let mut postings: FxHashMap<String, Vec<Posting>> = FxHashMap::default();
        let mut names: FxHashMap<DocId, Vec<(NodeId, NodeKind, QName)>> = FxHashMap::default();
        let mut tokenizer = WordTokenizer::new();
        for (&doc, rec) in &store.docs {
            let named = names.entry(doc).or_default();
            for node in &rec.nodes {
                if let Some(name) = &node.name {
                    named.push((node.id.clone(), node.kind, name.clone()));
                }
                let Some(text) = &node.text else {
                    continue;
                };
                tokenizer.set_text(text);
                while let Some(token) = tokenizer.next_token() {
                    postings
                        .entry(token.text.to_lowercase())
                        .or_default()
                        .push(Posting {
                            doc,
                            node: node.id.clone(),
                            kind: node.kind,
                            offset: token.start as u32,
                            length: (token.end - token.start) as u32,
                        });
                }
            }
            named.sort_by(|a, b| a.0.cmp(&b.0));
        }
        Self {
            postings,
            names,
            qname_indexes: FxHashMap::default(),
            type_tag: TypeTag::String,
        }
    }

    pub fn define_qname_index(&mut self, collection: CollectionId, qname: QName) {
        self.qname_indexes.entry(collection).or_default().push(qname);
    }

    pub fn set_type_tag(&mut self, tag: TypeTag) {
        self.type_tag = tag;
    }

    fn named_target(&self, posting: &Posting, axis: Axis, name: &QName) -> Option<NodeReference> {
        let names = self.names.get(&posting.doc)?;
        if matches!(axis, Axis::Attribute | Axis::DescendantAttribute) {
            // the hit itself must be the named attribute
            let i = names.binary_search_by(|(id, _, _)| id.cmp(&posting.node)).ok()?;
            let (_, kind, n) = &names[i];
            (*kind == NodeKind::Attribute && n == name).then(|| {
                NodeReference::new(posting.doc, posting.node.clone(), NodeKind::Attribute)
            })
        } else {
            // nearest ancestor-or-self element of that name
            let mut current = Some(posting.node.clone());
            while let Some(id) = current {
                if let Ok(i) = names.binary_search_by(|(nid, _, _)| nid.cmp(&id)) {
                    let (_, kind, n) = &names[i];
                    if *kind == NodeKind::Element && n == name {
                        return Some(NodeReference::new(posting.doc, id, NodeKind::Element));
                    }
                }
                current = id.parent();
            }
            None
        }
    }
}

impl IndexLookup for MemoryIndex {
    fn lookup(
        &self,
        docs: &DocumentSet,
        context: Option<&NodeSet>,
        axis: Axis,
        qname: Option<&QName>,
        term: &str,
        mode: MatchMode,
    ) -> Result<NodeSet, IndexError> {
        let mut lists: Vec<&Vec<Posting>> = Vec::new();
        match mode {
            MatchMode::Exact => {
                if let Some(list) = self.postings.get(&term.to_lowercase()) {
                    lists.push(list);
                }
            }
            MatchMode::Regexp => {
                let pattern =
                    glob_to_regex(term).map_err(|e| IndexError::new(e.to_string()))?;
                let re = RegexBuilder::new(&pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| IndexError::new(e.to_string()))?;
                for (token, list) in &self.postings {
                    if re.is_match(token) {
                        lists.push(list);
                    }
                }
            }
        }
        let mut result = NodeSet::new();
        for list in lists {
            for posting in list {
                if !docs.contains(posting.doc) {
                    continue;
                }
                let target = match qname {
                    Some(name) => match self.named_target(posting, axis, name) {
                        Some(t) => t,
                        None => continue,
                    },
                    None => {
                        NodeReference::new(posting.doc, posting.node.clone(), posting.kind)
                    }
                };
                if let Some(ctx) = context
                    && ctx
                        .parent_with_child(target.doc, &target.node, false, true)
                        .is_none()
                {
                    continue;
                }
                result.add_match(target, Match::new(0, posting.offset, posting.length));
            }
        }
        Ok(result)
    }

    fn has_qname_index(&self, collection: CollectionId, qname: &QName) -> bool {
        self.qname_indexes
            .get(&collection)
            .is_some_and(|names| names.contains(qname))
    }

    fn index_type_of(&self, _nodes: &NodeSet) -> TypeTag {
        self.type_tag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (MemoryStore, MemoryIndex) {
        let mut store = MemoryStore::new();
        store.insert_document(
            1,
            100,
            vec![
                NodeRecord::element(&[1], "book"),
                NodeRecord::element(&[1, 1], "title"),
                NodeRecord::text(&[1, 1, 1], "The Quick Start"),
                NodeRecord::element(&[1, 2], "para"),
                NodeRecord::text(&[1, 2, 1], "a quick brown fox"),
                NodeRecord::attribute(&[1, 2, 2], "lang", "english"),
            ],
        );
        let index = MemoryIndex::build(&store);
        (store, index)
    }

    fn all_docs() -> DocumentSet {
        [100].into_iter().collect()
    }

    #[test]
    fn atomizes_element_text() {
        let (store, _) = sample();
        let title = NodeReference::element(100, &[1, 1]);
        assert_eq!(store.node_text(&title).unwrap(), "The Quick Start");
        let book = NodeReference::element(100, &[1]);
        assert_eq!(
            store.node_text(&book).unwrap(),
            "The Quick Start a quick brown fox"
        );
    }

    #[test]
    fn exact_lookup_attributes_to_qname_ancestor() {
        let (_, index) = sample();
        let hits = index
            .lookup(
                &all_docs(),
                None,
                Axis::Descendant,
                Some(&QName::local("para")),
                "quick",
                MatchMode::Exact,
            )
            .unwrap();
        assert_eq!(hits.len(), 1);
        let hit = hits.get(0).unwrap();
        assert_eq!(hit.reference.node, NodeId::from_components(&[1, 2]));
        assert_eq!(hit.matches.len(), 1);
    }

    #[test]
    fn lookup_without_qname_returns_leaves() {
        let (_, index) = sample();
        let hits = index
            .lookup(
                &all_docs(),
                None,
                Axis::Descendant,
                None,
                "quick",
                MatchMode::Exact,
            )
            .unwrap();
        // one text node under title, one under para
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn wildcard_lookup() {
        let (_, index) = sample();
        let hits = index
            .lookup(
                &all_docs(),
                None,
                Axis::Descendant,
                Some(&QName::local("para")),
                "bro*",
                MatchMode::Regexp,
            )
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn attribute_axis_requires_named_attribute() {
        let (_, index) = sample();
        let hits = index
            .lookup(
                &all_docs(),
                None,
                Axis::DescendantAttribute,
                Some(&QName::local("lang")),
                "english",
                MatchMode::Exact,
            )
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits.get(0).unwrap().reference.kind, NodeKind::Attribute);
    }

    #[test]
    fn context_filter_restricts_hits() {
        let (_, index) = sample();
        let context = NodeSet::single(NodeReference::element(100, &[1, 1]));
        let hits = index
            .lookup(
                &all_docs(),
                Some(&context),
                Axis::Descendant,
                None,
                "quick",
                MatchMode::Exact,
            )
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(
            hits.get(0).unwrap().reference.node,
            NodeId::from_components(&[1, 1, 1])
        );
    }

    #[test]
    fn qname_index_declarations() {
        let (_, mut index) = sample();
        assert!(!index.has_qname_index(1, &QName::local("para")));
        index.define_qname_index(1, QName::local("para"));
        assert!(index.has_qname_index(1, &QName::local("para")));
        assert!(!index.has_qname_index(2, &QName::local("para")));
    }
}
