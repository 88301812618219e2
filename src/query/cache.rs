//! Single-slot result memoization.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::dom::NodeSet;
use crate::store::{DocumentEvent, NotificationService, Subscription, UpdateListener};

/// Identity token of the context set a result was computed for; see
/// [`NodeSet::token`].
pub type CacheToken = u64;

#[derive(Default)]
struct CacheSlot {
    entry: Mutex<Option<(CacheToken, NodeSet)>>,
}

impl UpdateListener for CacheSlot {
    fn document_updated(&self, _event: DocumentEvent) {
        // any mutation invalidates the slot wholesale
        *self.entry.lock() = None;
    }
}

/// Remembers the last evaluation result of one expression, keyed by the
/// identity token of the context set it was computed for.
///
/// The slot subscribes to the notification service on first `put`; every
/// mutation event clears it. Dropping the cache drops the subscription.
#[derive(Default)]
pub struct ResultCache {
    slot: Arc<CacheSlot>,
    subscription: Option<Subscription>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached result, if one exists for exactly this context.
    pub fn get(&self, token: CacheToken) -> Option<NodeSet> {
        let entry = self.slot.entry.lock();
        match &*entry {
            Some((cached, result)) if *cached == token => {
                debug!(token, "cache hit");
                Some(result.clone())
            }
            _ => None,
        }
    }

    pub fn put(&mut self, service: &Arc<NotificationService>, token: CacheToken, result: NodeSet) {
        if self.subscription.is_none() {
            self.subscription = Some(service.subscribe(Arc::downgrade(&self.slot)));
        }
        *self.slot.entry.lock() = Some((token, result));
    }

    pub fn invalidate(&self) {
        *self.slot.entry.lock() = None;
    }
}
