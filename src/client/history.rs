//! Bounded event history, newest first

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use super::dispatcher::{EventDispatcher, SubscriptionId};
use crate::types::Event;

/// Number of events kept by default
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Largest capacity accepted from configuration
pub const MAX_HISTORY_CAPACITY: usize = 10_000;

/// The last `capacity` published events, most recent first.
///
/// The cap is enforced on every insert, so memory stays bounded no matter how
/// fast events arrive. Repeated kinds are kept as separate entries.
pub struct EventHistory {
    entries: Mutex<VecDeque<Event>>,
    capacity: usize,
}

impl EventHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY))),
            capacity,
        }
    }

    /// Subscribe this history to `dispatcher`
    pub fn attach(self: &Arc<Self>, dispatcher: &EventDispatcher) -> SubscriptionId {
        let history = Arc::clone(self);
        dispatcher.subscribe(move |event| history.record(event))
    }

    /// Prepend `event`, dropping the oldest entries beyond capacity
    pub fn record(&self, event: &Event) {
        let mut entries = self.entries.lock();
        entries.push_front(event.clone());
        entries.truncate(self.capacity);
    }

    /// Current entries, newest first
    pub fn snapshot(&self) -> Vec<Event> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<Event> {
        self.entries.lock().front().cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
