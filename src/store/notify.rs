//! Mutation notifications: the channel that keeps cached query results
//! honest.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::dom::DocId;

/// A document-level mutation in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentEvent {
    Added(DocId),
    Removed(DocId),
    ContentChanged(DocId),
}

/// Receives mutation events. Implementations must tolerate delivery
/// from whichever thread performs the mutation.
pub trait UpdateListener: Send + Sync {
    fn document_updated(&self, event: DocumentEvent);
}

/// Fans mutation events out to subscribed listeners.
///
/// Listeners are held weakly; a dropped listener is pruned on the next
/// notification. [`subscribe`](NotificationService::subscribe) returns a
/// handle that unsubscribes when dropped, so a listener's registration
/// can never outlive its owner.
#[derive(Default)]
pub struct NotificationService {
    listeners: RwLock<Vec<(u64, Weak<dyn UpdateListener>)>>,
    next_id: AtomicU64,
}

impl NotificationService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn subscribe<L>(self: &Arc<Self>, listener: Weak<L>) -> Subscription
    where
        L: UpdateListener + 'static,
    {
        let listener: Weak<dyn UpdateListener> = listener;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().push((id, listener));
        Subscription {
            service: Arc::downgrade(self),
            id,
        }
    }

    fn unsubscribe(&self, id: u64) {
        self.listeners.write().retain(|(lid, _)| *lid != id);
    }

    /// Delivers `event` to every listener subscribed before the call.
    pub fn notify(&self, event: DocumentEvent) {
        let mut dead = false;
        for (_, listener) in self.listeners.read().iter() {
            match listener.upgrade() {
                Some(l) => l.document_updated(event),
                None => dead = true,
            }
        }
        if dead {
            self.listeners
                .write()
                .retain(|(_, l)| l.strong_count() > 0);
        }
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

/// Registration handle; dropping it unsubscribes the listener.
pub struct Subscription {
    service: Weak<NotificationService>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(service) = self.service.upgrade() {
            service.unsubscribe(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<DocumentEvent>>,
    }

    impl UpdateListener for Recorder {
        fn document_updated(&self, event: DocumentEvent) {
            self.events.lock().push(event);
        }
    }

    #[test]
    fn delivers_to_subscribed_listeners() {
        let service = NotificationService::new();
        let recorder = Arc::new(Recorder::default());
        let _sub = service.subscribe(Arc::downgrade(&recorder));

        service.notify(DocumentEvent::Added(3));
        service.notify(DocumentEvent::ContentChanged(3));
        assert_eq!(
            recorder.events.lock().as_slice(),
            &[DocumentEvent::Added(3), DocumentEvent::ContentChanged(3)]
        );
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let service = NotificationService::new();
        let recorder = Arc::new(Recorder::default());
        let sub = service.subscribe(Arc::downgrade(&recorder));
        assert_eq!(service.listener_count(), 1);
        drop(sub);
        assert_eq!(service.listener_count(), 0);

        service.notify(DocumentEvent::Removed(1));
        assert!(recorder.events.lock().is_empty());
    }

    #[test]
    fn dead_listeners_are_pruned() {
        let service = NotificationService::new();
        let recorder = Arc::new(Recorder::default());
        let _sub = service.subscribe(Arc::downgrade(&recorder));
        drop(recorder);
        service.notify(DocumentEvent::Added(1));
        assert_eq!(service.listener_count(), 0);
    }
}
