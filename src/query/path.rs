//! Minimal structural path evaluation.
//!
//! Just enough of a location-step evaluator to anchor full-text
//! predicates: the axes a text index can serve, wildcard or name tests,
//! and the preloaded-set handoff that lets a preselected index result
//! replace the structural lookup of the governing step.

use crate::dom::{DocumentSet, NodeKind, NodeSet, QName};
use crate::error::QueryError;
use crate::store::DocumentStore;

/// Axes the engine evaluates and indexes can correlate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    SelfAxis,
    Child,
    Descendant,
    DescendantOrSelf,
    Attribute,
    DescendantAttribute,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameTest {
    /// `*` or `node()`.
    Wildcard,
    Name(QName),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationStep {
    pub axis: Axis,
    pub test: NameTest,
}

impl LocationStep {
    pub fn new(axis: Axis, test: NameTest) -> Self {
        Self { axis, test }
    }

    pub fn named(axis: Axis, local: &str) -> Self {
        Self::new(axis, NameTest::Name(QName::local(local)))
    }

    pub fn wildcard(axis: Axis) -> Self {
        Self::new(axis, NameTest::Wildcard)
    }

    /// The node kind this step selects.
    pub fn target_kind(&self) -> NodeKind {
        match self.axis {
            Axis::Attribute | Axis::DescendantAttribute => NodeKind::Attribute,
            _ => NodeKind::Element,
        }
    }
}

/// A relative path: steps applied left to right to a context node set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    steps: Vec<LocationStep>,
    context_dependent: bool,
}

impl PathExpr {
    pub fn new(steps: Vec<LocationStep>) -> Self {
        Self {
            steps,
            context_dependent: false,
        }
    }

    /// Marks the path as depending on the dynamic context item, which
    /// forces item-at-a-time evaluation and disables optimization.
    pub fn with_context_dependence(mut self) -> Self {
        self.context_dependent = true;
        self
    }

    pub fn is_context_dependent(&self) -> bool {
        self.context_dependent
    }

    pub fn steps(&self) -> &[LocationStep] {
        &self.steps
    }

    /// Evaluates the path. `preloaded` supplies a ready-made candidate
    /// set for one step; that step then only applies its axis relation
    /// against the incoming set instead of consulting the store.
    pub fn eval(
        &self,
        store: &dyn DocumentStore,
        docs: &DocumentSet,
        context: &NodeSet,
        preloaded: Option<(usize, &NodeSet)>,
    ) -> Result<NodeSet, QueryError> {
        let mut current = context.clone();
        for (i, step) in self.steps.iter().enumerate() {
            if current.is_empty() {
                break;
            }
            let handoff = preloaded.and_then(|(idx, set)| (idx == i).then_some(set));
            current = eval_step(store, docs, step, &current, handoff)?;
        }
        Ok(current)
    }
}

fn eval_step(
    store: &dyn DocumentStore,
    docs: &DocumentSet,
    step: &LocationStep,
    current: &NodeSet,
    preloaded: Option<&NodeSet>,
) -> Result<NodeSet, QueryError> {
    let candidates = match preloaded {
        Some(set) => set.clone(),
        None => {
            if step.axis == Axis::SelfAxis {
                return Ok(filter_self(store, step, current));
            }
            match &step.test {
                NameTest::Name(q) => store.nodes_named(docs, q, step.target_kind()),
                NameTest::Wildcard => store.nodes_of_kind(docs, step.target_kind()),
            }
        }
    };
    Ok(match step.axis {
        Axis::SelfAxis => candidates.intersection(current),
        Axis::Child | Axis::Attribute => candidates.children_of(current),
        Axis::Descendant | Axis::DescendantAttribute => candidates.descendants_of(current, false),
        Axis::DescendantOrSelf => candidates.descendants_of(current, true),
    })
}

fn filter_self(store: &dyn DocumentStore, step: &LocationStep, current: &NodeSet) -> NodeSet {
    match &step.test {
        NameTest::Wildcard => current.clone(),
        NameTest::Name(q) => {
            let mut out = NodeSet::new();
            for hit in current.iter() {
                if hit.reference.kind == step.target_kind()
                    && store.node_name(&hit.reference).as_ref() == Some(q)
                {
                    out.add_hit(hit.clone());
                }
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{NodeId, NodeReference};
    use crate::store::{MemoryStore, NodeRecord};

    fn sample() -> (MemoryStore, DocumentSet, NodeSet) {
        let mut store = MemoryStore::new();
        store.insert_document(
            1,
            100,
            vec![
                NodeRecord::element(&[1], "book"),
                NodeRecord::element(&[1, 1], "chapter"),
                NodeRecord::element(&[1, 1, 1], "para"),
                NodeRecord::element(&[1, 1, 2], "para"),
                NodeRecord::element(&[1, 2], "appendix"),
                NodeRecord::element(&[1, 2, 1], "para"),
                NodeRecord::attribute(&[1, 2, 2], "id", "app1"),
            ],
        );
        let docs: DocumentSet = [100].into_iter().collect();
        let context = NodeSet::single(NodeReference::element(100, &[1]));
        (store, docs, context)
    }

    #[test]
    fn descendant_step() {
        let (store, docs, roots) = sample();
        let path = PathExpr::new(vec![LocationStep::named(Axis::Descendant, "para")]);
        let result = path.eval(&store, &docs, &roots, None).unwrap();
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn child_chain() {
        let (store, docs, roots) = sample();
        let path = PathExpr::new(vec![
            LocationStep::named(Axis::Child, "chapter"),
            LocationStep::named(Axis::Child, "para"),
        ]);
        let result = path.eval(&store, &docs, &roots, None).unwrap();
        assert_eq!(result.len(), 2);
        assert!(result.contains_id(100, &NodeId::from_components(&[1, 1, 1])));
    }

    #[test]
    fn attribute_step() {
        let (store, docs, roots) = sample();
        let path = PathExpr::new(vec![
            LocationStep::named(Axis::Child, "appendix"),
            LocationStep::named(Axis::Attribute, "id"),
        ]);
        let result = path.eval(&store, &docs, &roots, None).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.get(0).unwrap().reference.kind, NodeKind::Attribute);
    }

    #[test]
    fn self_step_filters_by_name() {
        let (store, docs, _) = sample();
        let mut context = NodeSet::new();
        context.add(NodeReference::element(100, &[1, 1]));
        context.add(NodeReference::element(100, &[1, 2]));
        let path = PathExpr::new(vec![LocationStep::named(Axis::SelfAxis, "chapter")]);
        let result = path.eval(&store, &docs, &context, None).unwrap();
        assert_eq!(result.len(), 1);
        assert!(result.contains_id(100, &NodeId::from_components(&[1, 1])));
    }

    #[test]
    fn preloaded_set_replaces_structural_lookup() {
        let (store, docs, roots) = sample();
        // only one of the three paras arrives preloaded
        let preloaded = NodeSet::single(NodeReference::element(100, &[1, 1, 2]));
        let path = PathExpr::new(vec![LocationStep::named(Axis::Descendant, "para")]);
        let result = path.eval(&store, &docs, &roots, Some((0, &preloaded))).unwrap();
        assert_eq!(result.len(), 1);
        assert!(result.contains_id(100, &NodeId::from_components(&[1, 1, 2])));
    }

    #[test]
    fn empty_context_short_circuits() {
        let (store, docs, _) = sample();
        let path = PathExpr::new(vec![LocationStep::named(Axis::Descendant, "para")]);
        let result = path.eval(&store, &docs, &NodeSet::new(), None).unwrap();
        assert!(result.is_empty());
    }
}
