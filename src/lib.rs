//! # xqft - Index-Aware Full-Text Query Evaluation
//!
//! xqft is the query-side full-text layer of an XML database: it decides
//! when a query can be answered through the text index, narrows
//! candidates through it, and verifies the rest by scanning node text,
//! with identical results either way.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`dom`] - Node identities, ordered node-set algebra, match records
//! - [`text`] - Tokenization, pattern translation, proximity scanning
//! - [`query`] - Structural paths, the optimization protocol, caching
//! - [`store`] - Interfaces to the surrounding database + in-memory impls
//! - [`config`] / [`error`] - Engine tunables and the error taxonomy
//!
//! ## Quick Start
//!
//! ```
//! use xqft::config::EngineConfig;
//! use xqft::dom::NodeSet;
//! use xqft::query::{
//!     AnalyzeContext, Axis, EvalScope, FulltextQuery, LocationStep, MatchKind, PathExpr,
//! };
//! use xqft::store::{
//!     materialize_collection, MemoryIndex, MemoryStore, NodeRecord, NotificationService,
//!     UnlimitedWatchdog,
//! };
//! use xqft::text::{SearchTerm, WordTokenizer};
//!
//! let mut store = MemoryStore::new();
//! store.insert_document(
//!     1,
//!     100,
//!     vec![
//!         NodeRecord::element(&[1], "book"),
//!         NodeRecord::element_with_text(&[1, 1], "para", "the quick brown fox"),
//!     ],
//! );
//! let index = MemoryIndex::build(&store);
//! let notifier = NotificationService::new();
//! let config = EngineConfig::default();
//!
//! let context = materialize_collection(&store, 1, None);
//! let docs = context.document_set();
//! let scope = EvalScope {
//!     store: &store,
//!     index: &index,
//!     notifier: &notifier,
//!     watchdog: &UnlimitedWatchdog,
//!     config: &config,
//!     normalizer: None,
//!     docs: &docs,
//!     cacheable: true,
//! };
//!
//! let mut query = FulltextQuery::new(
//!     1,
//!     PathExpr::new(vec![LocationStep::named(Axis::Descendant, "para")]),
//!     vec![SearchTerm::new("quick"), SearchTerm::new("fox")],
//!     MatchKind::AllTerms,
//!     Box::new(WordTokenizer::new()),
//! )
//! .unwrap();
//! query.analyze(&AnalyzeContext { enclosing_step: None });
//!
//! let result = query.eval(&scope, &context).unwrap();
//! assert_eq!(result.len(), 1);
//! ```
//!
//! ## Evaluation strategy
//!
//! Evaluation is two-phase where the index allows it:
//!
//! 1. **Preselection** - per-term index lookups, combined by union or
//!    ancestor-correlated intersection, handed to the governing location
//!    step as a ready-made candidate set
//! 2. **Verification** - phrase and near operators re-check the token
//!    window against the actual node text
//!
//! When any collection in scope lacks the index, the same scanners run
//! over the structurally selected candidates instead, so an index only
//! ever changes the cost of a query, never its result.

pub mod config;
pub mod dom;
pub mod error;
pub mod query;
pub mod store;
pub mod text;
