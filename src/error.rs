//! Error taxonomy for query evaluation.

use thiserror::Error;

/// A pattern uses syntax that cannot be mapped onto the `regex` crate.
///
/// Carries the offending construct and its byte position in the source
/// pattern so callers can point at the exact spot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported construct `{construct}` at offset {position}")]
pub struct RegexSyntaxError {
    pub construct: String,
    pub position: usize,
}

impl RegexSyntaxError {
    pub fn new(construct: impl Into<String>, position: usize) -> Self {
        Self {
            construct: construct.into(),
            position,
        }
    }
}

/// Failure reported by an index implementation during a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("index lookup failed: {reason}")]
pub struct IndexError {
    pub reason: String,
}

impl IndexError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Failure to acquire a document read lock.
///
/// Deliberately not part of [`QueryError`]: lock failures are recoverable,
/// the affected document is skipped with a warning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not acquire read lock on document {doc}: {reason}")]
pub struct LockError {
    pub doc: u32,
    pub reason: String,
}

/// Fatal errors surfaced to the caller of query evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error(transparent)]
    RegexSyntax(#[from] RegexSyntaxError),

    #[error(transparent)]
    Index(#[from] IndexError),

    /// The watchdog cancelled the query between candidate nodes.
    #[error("query cancelled: {0}")]
    Cancelled(String),

    /// A multi-term operator was built with too few terms. Raised at
    /// construction time, before any document or index access.
    #[error("{operator} requires at least {required} search terms, got {supplied}")]
    NotEnoughTerms {
        operator: &'static str,
        required: usize,
        supplied: usize,
    },
}
