//! Observers that record copy events for assertions.

use parking_lot::RwLock;

use crate::events::{CopyEvent, CopyObserver};

/// Collects every event it observes.
#[derive(Debug, Default)]
pub struct CollectingCopyObserver {
    events: RwLock<Vec<CopyEvent>>,
}

impl CollectingCopyObserver {
    /// Creates an empty observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events so far, in arrival order.
    #[must_use]
    pub fn events(&self) -> Vec<CopyEvent> {
        self.events.read().clone()
    }

    /// Events whose type starts with `prefix`.
    #[must_use]
    pub fn events_of_type(&self, prefix: &str) -> Vec<CopyEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type().starts_with(prefix))
            .cloned()
            .collect()
    }
}

impl CopyObserver for CollectingCopyObserver {
    fn observe(&self, event: &CopyEvent) {
        self.events.write().push(event.clone());
    }
}
