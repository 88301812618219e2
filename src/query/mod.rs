//! Query evaluation: structural paths, the index-optimization protocol
//! and result caching.

mod cache;
mod optimize;
mod path;

pub use cache::{CacheToken, ResultCache};
pub use optimize::{AnalyzeContext, FulltextQuery, MatchKind, OptimizationContext};
pub use path::{Axis, LocationStep, NameTest, PathExpr};

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::dom::DocumentSet;
use crate::store::{
    DocumentStore, IndexLookup, NotificationService, QueryWatchdog, TextNormalizer,
};

/// Everything one evaluation round borrows from the engine.
pub struct EvalScope<'a> {
    pub store: &'a dyn DocumentStore,
    pub index: &'a dyn IndexLookup,
    pub notifier: &'a Arc<NotificationService>,
    pub watchdog: &'a dyn QueryWatchdog,
    pub config: &'a EngineConfig,
    pub normalizer: Option<&'a dyn TextNormalizer>,
    /// Documents the query ranges over.
    pub docs: &'a DocumentSet,
    /// Whether results may be remembered across evaluations.
    pub cacheable: bool,
}
