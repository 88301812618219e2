//! Document scope for index lookups.

use roaring::RoaringBitmap;

use super::DocId;

/// The set of documents a lookup or evaluation is confined to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentSet {
    docs: RoaringBitmap,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, doc: DocId) {
        self.docs.insert(doc);
    }

    pub fn contains(&self, doc: DocId) -> bool {
        self.docs.contains(doc)
    }

    pub fn len(&self) -> u64 {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = DocId> + '_ {
        self.docs.iter()
    }

    pub fn union(&self, other: &DocumentSet) -> DocumentSet {
        DocumentSet {
            docs: &self.docs | &other.docs,
        }
    }
}

impl FromIterator<DocId> for DocumentSet {
    fn from_iter<T: IntoIterator<Item = DocId>>(iter: T) -> Self {
        Self {
            docs: iter.into_iter().collect(),
        }
    }
}
