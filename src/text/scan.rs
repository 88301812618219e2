//! Term scanners: the ordered proximity matcher used by phrase/near
//! queries and the unordered any/all scans used by the unindexed
//! fallback.
//!
//! Scans verify candidates against the actual node text, so an indexed
//! evaluation and a scan-only evaluation of the same query select the
//! same nodes.

use crate::config::EngineConfig;
use crate::dom::{ExpressionId, Match, NodeHit, NodeSet};
use crate::error::QueryError;
use crate::store::{DocumentStore, QueryWatchdog, TextNormalizer};
use crate::text::terms::SearchTerm;
use crate::text::tokenizer::Tokenizer;

/// Allowed token distance between consecutive terms of an ordered
/// sequence. Adjacent tokens are at distance 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistanceWindow {
    pub min: u32,
    pub max: u32,
}

impl DistanceWindow {
    /// Exact phrase: every term directly follows the previous one.
    pub const ADJACENT: Self = Self { min: 1, max: 1 };

    pub fn new(min: u32, max: u32) -> Self {
        debug_assert!(min <= max);
        Self { min, max }
    }

    pub fn up_to(max: u32) -> Self {
        Self { min: 1, max }
    }
}

/// Everything a scan needs from the outside world.
pub struct ScanContext<'a> {
    pub store: &'a dyn DocumentStore,
    pub tokenizer: &'a mut dyn Tokenizer,
    pub normalizer: Option<&'a dyn TextNormalizer>,
    pub watchdog: &'a dyn QueryWatchdog,
}

/// Scans candidate nodes for a fixed term list.
pub struct TextScanner<'a> {
    terms: &'a [SearchTerm],
    expression: ExpressionId,
    config: &'a EngineConfig,
}

impl<'a> TextScanner<'a> {
    pub fn new(terms: &'a [SearchTerm], expression: ExpressionId, config: &'a EngineConfig) -> Self {
        Self {
            terms,
            expression,
            config,
        }
    }

    /// Keeps the candidates whose text contains the terms in order within
    /// `window`, recording one [`Match`] per occurrence spanning the
    /// first to the last term. The watchdog runs between nodes, never
    /// inside one.
    pub fn scan_proximity(
        &self,
        window: DistanceWindow,
        candidates: &NodeSet,
        cx: &mut ScanContext<'_>,
    ) -> Result<NodeSet, QueryError> {
        let mut result = NodeSet::new();
        for hit in candidates.iter() {
            cx.watchdog.checkpoint()?;
            let Some(text) = cx.store.node_text(&hit.reference) else {
                continue;
            };
            let text = apply_normalizer(cx.normalizer, text);
            cx.tokenizer.set_text(&text);
            let matches = self.ordered_occurrences(window, &mut *cx.tokenizer)?;
            if matches.is_empty() {
                continue;
            }
            result.add_hit(self.hit_with(hit, matches));
        }
        Ok(result)
    }

    /// Keeps the candidates containing at least one of the terms.
    pub fn scan_any(
        &self,
        candidates: &NodeSet,
        cx: &mut ScanContext<'_>,
    ) -> Result<NodeSet, QueryError> {
        self.scan_unordered(false, candidates, cx)
    }

    /// Keeps the candidates containing every term, in any order.
    pub fn scan_all(
        &self,
        candidates: &NodeSet,
        cx: &mut ScanContext<'_>,
    ) -> Result<NodeSet, QueryError> {
        self.scan_unordered(true, candidates, cx)
    }

    fn scan_unordered(
        &self,
        require_all: bool,
        candidates: &NodeSet,
        cx: &mut ScanContext<'_>,
    ) -> Result<NodeSet, QueryError> {
        let mut result = NodeSet::new();
        for hit in candidates.iter() {
            cx.watchdog.checkpoint()?;
            let Some(text) = cx.store.node_text(&hit.reference) else {
                continue;
            };
            let text = apply_normalizer(cx.normalizer, text);
            cx.tokenizer.set_text(&text);
            let (matches, seen) = self.unordered_occurrences(&mut *cx.tokenizer)?;
            let selected = if require_all {
                seen.iter().all(|&s| s)
            } else {
                seen.iter().any(|&s| s)
            };
            if !selected {
                continue;
            }
            result.add_hit(self.hit_with(hit, matches));
        }
        Ok(result)
    }

    fn hit_with(&self, source: &NodeHit, matches: Vec<Match>) -> NodeHit {
        let mut out = NodeHit::new(source.reference.clone());
        if self.config.track_matches {
            out.matches.extend(matches);
        }
        out
    }

    /// Single left-to-right pass. `next` is the index of the term the
    /// scan expects; `distance` counts tokens examined since the last
    /// accepted term and is bumped before each test.
    fn ordered_occurrences(
        &self,
        window: DistanceWindow,
        tokenizer: &mut dyn Tokenizer,
    ) -> Result<Vec<Match>, QueryError> {
        let mut matches = Vec::new();
        let mut next = 0usize;
        let mut distance = 0u32;
        let mut start = 0usize;
        while let Some(token) = tokenizer.next_token() {
            if next > 0 {
                distance += 1;
            }
            let in_window = window.min <= distance && distance <= window.max;
            if self.term_matches(&self.terms[next], token.text)? && (next == 0 || in_window) {
                if next == 0 {
                    start = token.start;
                }
                next += 1;
                distance = 0;
                if next == self.terms.len() {
                    matches.push(Match::new(
                        self.expression,
                        start as u32,
                        (token.end - start) as u32,
                    ));
                    next = 0;
                }
            } else if next > 0 {
                if distance > window.max {
                    next = 0;
                }
                // a token matching the first term restarts the sequence
                // instead of being discarded
                if self.term_matches(&self.terms[0], token.text)? {
                    start = token.start;
                    next = 1;
                    distance = 0;
                }
            }
        }
        Ok(matches)
    }

    fn unordered_occurrences(
        &self,
        tokenizer: &mut dyn Tokenizer,
    ) -> Result<(Vec<Match>, Vec<bool>), QueryError> {
        let mut seen = vec![false; self.terms.len()];
        let mut matches = Vec::new();
        while let Some(token) = tokenizer.next_token() {
            for (i, term) in self.terms.iter().enumerate() {
                if self.term_matches(term, token.text)? {
                    seen[i] = true;
                    matches.push(Match::new(
                        self.expression,
                        token.start as u32,
                        (token.end - token.start) as u32,
                    ));
                    break;
                }
            }
        }
        Ok((matches, seen))
    }

    fn term_matches(&self, term: &SearchTerm, token: &str) -> Result<bool, QueryError> {
        if self.config.is_stopword(term.raw()) {
            return Ok(false);
        }
        Ok(term.matches_token(token)?)
    }
}

fn apply_normalizer(normalizer: Option<&dyn TextNormalizer>, text: String) -> String {
    match normalizer {
        Some(n) => n.normalize(&text).into_owned(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::tokenizer::WordTokenizer;

    fn terms(words: &[&str]) -> Vec<SearchTerm> {
        words.iter().map(|w| SearchTerm::new(*w)).collect()
    }

    fn ordered(text: &str, words: &[&str], window: DistanceWindow) -> Vec<Match> {
        let terms = terms(words);
        let config = EngineConfig::default();
        let scanner = TextScanner::new(&terms, 1, &config);
        let mut tok = WordTokenizer::new();
        tok.set_text(text);
        scanner.ordered_occurrences(window, &mut tok).unwrap()
    }

    #[test]
    fn adjacent_phrase() {
        assert_eq!(ordered("a b", &["a", "b"], DistanceWindow::ADJACENT).len(), 1);
        assert!(ordered("a x b", &["a", "b"], DistanceWindow::ADJACENT).is_empty());
        assert!(ordered("b a", &["a", "b"], DistanceWindow::ADJACENT).is_empty());
    }

    #[test]
    fn first_term_restarts_sequence() {
        // the second "a" must restart the window, not be discarded
        let m = ordered("a a b", &["a", "b"], DistanceWindow::ADJACENT);
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].offset, 2);
        assert_eq!(m[0].length, 3);
    }

    #[test]
    fn window_boundary_zero_to_one() {
        // a zero minimum behaves like adjacency: the first term is
        // exempt from the window either way
        let w = DistanceWindow::new(0, 1);
        assert_eq!(ordered("a b", &["a", "b"], w).len(), 1);
        assert!(ordered("a x b", &["a", "b"], w).is_empty());
        let m = ordered("a a b", &["a", "b"], w);
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].offset, 2);
    }

    #[test]
    fn near_within_distance() {
        let m = ordered(
            "the quick brown fox jumps",
            &["quick", "fox"],
            DistanceWindow::up_to(2),
        );
        assert_eq!(m.len(), 1);
        // spans "quick brown fox"
        assert_eq!(m[0].offset, 4);
        assert_eq!(m[0].length, 15);

        assert!(
            ordered(
                "the quick brown fox jumps",
                &["quick", "jumps"],
                DistanceWindow::up_to(2),
            )
            .is_empty()
        );
    }

    #[test]
    fn minimum_distance_enforced() {
        let w = DistanceWindow::new(2, 3);
        assert!(ordered("a b", &["a", "b"], w).is_empty());
        assert_eq!(ordered("a x b", &["a", "b"], w).len(), 1);
        assert_eq!(ordered("a x y b", &["a", "b"], w).len(), 1);
        assert!(ordered("a x y z b", &["a", "b"], w).is_empty());
    }

    #[test]
    fn multiple_occurrences_recorded() {
        let m = ordered("a b c a b", &["a", "b"], DistanceWindow::ADJACENT);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn restart_after_window_overflow() {
        // overflow kills the first sequence; the trailing "a b" still hits
        let m = ordered("a x x a b", &["a", "b"], DistanceWindow::ADJACENT);
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].offset, 6);
    }

    #[test]
    fn wildcard_terms_in_sequence() {
        let m = ordered(
            "the quick brown fox",
            &["qu*", "brown"],
            DistanceWindow::ADJACENT,
        );
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn three_term_phrase() {
        let m = ordered(
            "one two three four",
            &["one", "two", "three"],
            DistanceWindow::ADJACENT,
        );
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].offset, 0);
        assert_eq!(m[0].length, 13);
    }

    #[test]
    fn stopword_term_never_matches() {
        let term_list = terms(&["the", "fox"]);
        let config = EngineConfig {
            stopwords: vec!["the".into()],
            ..EngineConfig::default()
        };
        let scanner = TextScanner::new(&term_list, 1, &config);
        let mut tok = WordTokenizer::new();
        tok.set_text("the fox");
        let m = scanner
            .ordered_occurrences(DistanceWindow::ADJACENT, &mut tok)
            .unwrap();
        assert!(m.is_empty());
    }

    #[test]
    fn unordered_all_and_any() {
        let term_list = terms(&["fox", "dog"]);
        let config = EngineConfig::default();
        let scanner = TextScanner::new(&term_list, 1, &config);
        let mut tok = WordTokenizer::new();

        tok.set_text("lazy dog, quick fox");
        let (matches, seen) = scanner.unordered_occurrences(&mut tok).unwrap();
        assert_eq!(matches.len(), 2);
        assert!(seen.iter().all(|&s| s));

        tok.set_text("quick fox only");
        let (_, seen) = scanner.unordered_occurrences(&mut tok).unwrap();
        assert!(seen[0]);
        assert!(!seen[1]);
    }
}
