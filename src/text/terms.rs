//! Search terms: literals and glob wildcards.

use std::cell::OnceCell;

use regex::{Regex, RegexBuilder};

use crate::error::RegexSyntaxError;
use crate::text::translate::glob_to_regex;

/// A single query term.
///
/// Terms containing glob metacharacters (`?`, `*`, `[`, `\`) match by an
/// anchored, case-insensitive regex compiled lazily on first use and
/// cached for the lifetime of the term. Literal terms compare
/// case-insensitively without compiling anything.
#[derive(Debug, Clone)]
pub struct SearchTerm {
    raw: String,
    wildcard: bool,
    pattern: OnceCell<Regex>,
}

impl SearchTerm {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let wildcard = raw.contains(['?', '*', '[', '\\']);
        Self {
            raw,
            wildcard,
            pattern: OnceCell::new(),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// The compiled pattern of a wildcard term. First call translates and
    /// compiles; later calls return the cached regex.
    pub fn pattern(&self) -> Result<&Regex, RegexSyntaxError> {
        if let Some(re) = self.pattern.get() {
            return Ok(re);
        }
        let translated = glob_to_regex(&self.raw)?;
        let re = RegexBuilder::new(&translated)
            .case_insensitive(true)
            .build()
            .map_err(|_| RegexSyntaxError::new(self.raw.clone(), 0))?;
        Ok(self.pattern.get_or_init(|| re))
    }

    /// Whole-token test against one token.
    pub fn matches_token(&self, token: &str) -> Result<bool, RegexSyntaxError> {
        if self.wildcard {
            Ok(self.pattern()?.is_match(token))
        } else {
            Ok(eq_ignore_case(&self.raw, token))
        }
    }
}

/// Unicode case-insensitive comparison without allocating.
fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_terms_ignore_case() {
        let t = SearchTerm::new("Fox");
        assert!(!t.is_wildcard());
        assert!(t.matches_token("fox").unwrap());
        assert!(t.matches_token("FOX").unwrap());
        assert!(!t.matches_token("foxes").unwrap());
    }

    #[test]
    fn wildcard_terms_compile_once() {
        let t = SearchTerm::new("qu?ck");
        assert!(t.is_wildcard());
        assert!(t.matches_token("quick").unwrap());
        assert!(t.matches_token("QUACK").unwrap());
        assert!(!t.matches_token("quicker").unwrap());
        let first = t.pattern().unwrap() as *const Regex;
        let second = t.pattern().unwrap() as *const Regex;
        assert_eq!(first, second);
    }

    #[test]
    fn invalid_wildcard_surfaces_translation_error() {
        let t = SearchTerm::new("a[bc");
        assert!(t.matches_token("abc").is_err());
    }

    #[test]
    fn unicode_case_folding() {
        let t = SearchTerm::new("été");
        assert!(t.matches_token("ÉTÉ").unwrap());
    }
}
