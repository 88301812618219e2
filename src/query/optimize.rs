//! The index-optimization protocol.
//!
//! A [`FulltextQuery`] is evaluated in up to four stages: `analyze`
//! extracts a candidate QName at compile time, `can_optimize` re-checks
//! index coverage against the actual document scope, `pre_select`
//! narrows candidates through the index, and `eval` produces the final
//! node set, verifying proximity by scanning where the index alone
//! cannot decide. Evaluation with and without preselection selects the
//! same nodes; the index only makes it cheaper.

use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::dom::{ExpressionId, NodeSet, QName};
use crate::error::QueryError;
use crate::store::{MatchMode, SYSTEM_COLLECTION, TypeTag};
use crate::text::{DistanceWindow, ScanContext, SearchTerm, TextScanner, Tokenizer};

use super::cache::ResultCache;
use super::path::{Axis, LocationStep, NameTest, PathExpr};
use super::EvalScope;

/// How the terms of a query combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// At least one term occurs.
    AnyTerm,
    /// Every term occurs, in any order.
    AllTerms,
    /// Terms occur adjacently, in order.
    Phrase,
    /// Terms occur in order within a token-distance window.
    Near { min: u32, max: u32 },
}

impl MatchKind {
    /// `near()` with the configured default distance.
    pub fn near_default(config: &EngineConfig) -> Self {
        Self::Near {
            min: 1,
            max: config.default_near_distance,
        }
    }

    fn combines_by_union(self) -> bool {
        matches!(self, Self::AnyTerm)
    }

    /// The proximity window to verify by scanning, if any. Independent
    /// term operators need no verification beyond the index result.
    fn window(self) -> Option<DistanceWindow> {
        match self {
            Self::Phrase => Some(DistanceWindow::ADJACENT),
            Self::Near { min, max } => Some(DistanceWindow::new(min, max)),
            _ => None,
        }
    }

    fn operator(self) -> &'static str {
        match self {
            Self::AnyTerm => "any-term",
            Self::AllTerms => "all-terms",
            Self::Phrase => "phrase",
            Self::Near { .. } => "near",
        }
    }

    fn min_terms(self) -> usize {
        match self {
            Self::Phrase | Self::Near { .. } => 2,
            _ => 1,
        }
    }
}

/// Where `analyze` found the expression sitting in its surrounding path.
pub struct AnalyzeContext<'a> {
    /// The location step whose predicate contains this expression.
    pub enclosing_step: Option<&'a LocationStep>,
}

/// What the static analysis decided, and the preselected candidates
/// parked between `pre_select` and `eval`.
#[derive(Debug, Default, Clone)]
pub struct OptimizationContext {
    /// QName whose index would serve this expression.
    pub candidate: Option<QName>,
    /// Axis relating indexed candidates to the context.
    pub axis: Option<Axis>,
    /// The step that receives the preselected set during `eval`.
    pub step_index: usize,
    /// Candidate was taken from the enclosing step (single self step).
    pub optimize_self: bool,
    /// Parked index result; cleared at the start of every round.
    pub preselected: Option<NodeSet>,
}

/// A compiled full-text predicate over a structural path.
///
/// Holds per-evaluation state (preselection, cache); instances are not
/// shared between threads.
pub struct FulltextQuery {
    id: ExpressionId,
    path: PathExpr,
    terms: Vec<SearchTerm>,
    kind: MatchKind,
    opt: OptimizationContext,
    cache: ResultCache,
    tokenizer: Box<dyn Tokenizer>,
}

impl FulltextQuery {
    /// Multi-term operators reject fewer than two terms here, before any
    /// document or index access.
    pub fn new(
        id: ExpressionId,
        path: PathExpr,
        terms: Vec<SearchTerm>,
        kind: MatchKind,
        tokenizer: Box<dyn Tokenizer>,
    ) -> Result<Self, QueryError> {
        let required = kind.min_terms();
        if terms.len() < required {
            return Err(QueryError::NotEnoughTerms {
                operator: kind.operator(),
                required,
                supplied: terms.len(),
            });
        }
        Ok(Self {
            id,
            path,
            terms,
            kind,
            opt: OptimizationContext::default(),
            cache: ResultCache::new(),
            tokenizer,
        })
    }

    pub fn id(&self) -> ExpressionId {
        self.id
    }

    pub fn optimization(&self) -> &OptimizationContext {
        &self.opt
    }

    /// Static analysis: picks the candidate QName and governing axis
    /// from the path shape. A single self step takes the name of the
    /// enclosing step; otherwise the last named step governs, with the
    /// first step's axis (or the second's when the path starts at self).
    pub fn analyze(&mut self, cx: &AnalyzeContext<'_>) {
        self.opt = OptimizationContext::default();
        if self.path.is_context_dependent() {
            return;
        }
        let steps = self.path.steps();
        let Some(first) = steps.first() else {
            return;
        };
        if steps.len() == 1 && first.axis == Axis::SelfAxis {
            if let Some(outer) = cx.enclosing_step
                && let NameTest::Name(q) = &outer.test
            {
                self.opt.candidate = Some(q.clone());
                self.opt.axis = Some(outer.axis);
                self.opt.step_index = 0;
                self.opt.optimize_self = true;
            }
            return;
        }
        let last = steps.last().unwrap_or(first);
        if let NameTest::Name(q) = &last.test {
            self.opt.candidate = Some(q.clone());
            let axis = if first.axis == Axis::SelfAxis && steps.len() > 1 {
                steps[1].axis
            } else {
                first.axis
            };
            self.opt.axis = Some(axis);
            self.opt.step_index = steps.len() - 1;
        }
    }

    /// Dynamic re-check: optimization applies only when every non-system
    /// collection in scope declares the candidate index, and wildcard
    /// terms additionally need a string-typed index.
    pub fn can_optimize(&self, scope: &EvalScope<'_>, context: &NodeSet) -> bool {
        if self.path.is_context_dependent() {
            return false;
        }
        let Some(name) = &self.opt.candidate else {
            return false;
        };
        let collections = scope.store.collections_of(scope.docs);
        if collections.is_empty() {
            return false;
        }
        for collection in collections {
            if collection == SYSTEM_COLLECTION {
                continue;
            }
            if !scope.index.has_qname_index(collection, name) {
                debug!(collection, name = %name, "no qname index, falling back to scan");
                return false;
            }
        }
        if self.terms.iter().any(SearchTerm::is_wildcard)
            && scope.index.index_type_of(context) != TypeTag::String
        {
            debug!("wildcard terms need a string-typed index, falling back to scan");
            return false;
        }
        true
    }

    /// Index phase: one lookup per term, combined by union for `AnyTerm`
    /// and by ancestor-correlated intersection for everything else. The
    /// result is parked for the next `eval`. An empty combination is
    /// terminal for the AND operators and stops further lookups.
    pub fn pre_select(
        &mut self,
        scope: &EvalScope<'_>,
        context: &NodeSet,
        use_context_filter: bool,
    ) -> Result<&NodeSet, QueryError> {
        self.opt.preselected = None;
        let axis = self.opt.axis.unwrap_or(Axis::Descendant);
        let qname = self.opt.candidate.clone();
        let context_filter = use_context_filter.then_some(context);
        let mut combined: Option<NodeSet> = None;
        for term in &self.terms {
            let hits = if scope.config.is_stopword(term.raw()) {
                NodeSet::new()
            } else {
                let mode = if term.is_wildcard() {
                    MatchMode::Regexp
                } else {
                    MatchMode::Exact
                };
                scope
                    .index
                    .lookup(scope.docs, context_filter, axis, qname.as_ref(), term.raw(), mode)?
            };
            trace!(term = term.raw(), hits = hits.len(), "index lookup");
            combined = Some(match combined {
                None => hits,
                Some(acc) if self.kind.combines_by_union() => acc.union(&hits),
                Some(acc) => acc.deep_intersection(&hits),
            });
            if !self.kind.combines_by_union()
                && combined.as_ref().is_some_and(NodeSet::is_empty)
            {
                break;
            }
        }
        Ok(self.opt.preselected.insert(combined.unwrap_or_default()))
    }

    /// Produces the matching nodes for `context`.
    ///
    /// With a parked preselection the governing step receives it as a
    /// ready-made candidate set; phrase/near results are then verified
    /// by scanning. Without one the path is evaluated structurally and
    /// all candidates are scanned. Either way the preselection is
    /// consumed, and a cacheable result is remembered for an identical
    /// context.
    pub fn eval(
        &mut self,
        scope: &EvalScope<'_>,
        context: &NodeSet,
    ) -> Result<NodeSet, QueryError> {
        // the parked set belongs to this round alone; consume it even
        // when the cache answers
        let preselected = self.opt.preselected.take();
        if let Some(cached) = self.cache.get(context.token()) {
            return Ok(cached);
        }
        let result = match preselected {
            Some(pre) if pre.is_empty() => NodeSet::new(),
            Some(pre) => {
                let candidates = self.path.eval(
                    scope.store,
                    scope.docs,
                    context,
                    Some((self.opt.step_index, &pre)),
                )?;
                self.verify_indexed(scope, candidates)?
            }
            None => {
                if self.path.is_context_dependent() {
                    let mut out = NodeSet::new();
                    for hit in context.iter() {
                        let single = NodeSet::single(hit.reference.clone());
                        let candidates =
                            self.path.eval(scope.store, scope.docs, &single, None)?;
                        let verified = self.scan_candidates(scope, &candidates)?;
                        out = out.union(&verified);
                    }
                    out
                } else {
                    let candidates = self.path.eval(scope.store, scope.docs, context, None)?;
                    self.scan_candidates(scope, &candidates)?
                }
            }
        };
        if scope.cacheable && !self.path.is_context_dependent() {
            self.cache.put(scope.notifier, context.token(), result.clone());
        }
        Ok(result)
    }

    /// Drops any parked preselection and cached result.
    pub fn reset(&mut self) {
        self.opt.preselected = None;
        self.cache.invalidate();
    }

    /// After preselection: independent-term results are already exact,
    /// ordered operators re-check the window against the text.
    fn verify_indexed(
        &mut self,
        scope: &EvalScope<'_>,
        candidates: NodeSet,
    ) -> Result<NodeSet, QueryError> {
        let Some(window) = self.kind.window() else {
            return Ok(candidates);
        };
        let scanner = TextScanner::new(&self.terms, self.id, scope.config);
        let mut cx = ScanContext {
            store: scope.store,
            tokenizer: self.tokenizer.as_mut(),
            normalizer: scope.normalizer,
            watchdog: scope.watchdog,
        };
        scanner.scan_proximity(window, &candidates, &mut cx)
    }

    /// The unindexed path: every candidate is scanned.
    fn scan_candidates(
        &mut self,
        scope: &EvalScope<'_>,
        candidates: &NodeSet,
    ) -> Result<NodeSet, QueryError> {
        let scanner = TextScanner::new(&self.terms, self.id, scope.config);
        let mut cx = ScanContext {
            store: scope.store,
            tokenizer: self.tokenizer.as_mut(),
            normalizer: scope.normalizer,
            watchdog: scope.watchdog,
        };
        match self.kind {
            MatchKind::AnyTerm => scanner.scan_any(candidates, &mut cx),
            MatchKind::AllTerms => scanner.scan_all(candidates, &mut cx),
            MatchKind::Phrase => {
                scanner.scan_proximity(DistanceWindow::ADJACENT, candidates, &mut cx)
            }
            MatchKind::Near { min, max } => {
                scanner.scan_proximity(DistanceWindow::new(min, max), candidates, &mut cx)
            }
        }
    }
}
