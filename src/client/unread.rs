//! Unread indicator for the surface that displays the history

use std::sync::Arc;

use parking_lot::Mutex;

use super::dispatcher::{EventDispatcher, SubscriptionId};

#[derive(Debug, Default)]
struct UnreadState {
    count: u64,
    view_open: bool,
}

/// Counts events published while the history view is closed.
///
/// The count always equals the number of events published since the view was
/// last opened (or since creation if it never was).
#[derive(Debug, Default)]
pub struct UnreadIndicator {
    state: Mutex<UnreadState>,
}

impl UnreadIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe this indicator to `dispatcher`
    pub fn attach(self: &Arc<Self>, dispatcher: &EventDispatcher) -> SubscriptionId {
        let unread = Arc::clone(self);
        dispatcher.subscribe(move |_| unread.record_event())
    }

    /// Count one published event unless the view is open
    pub fn record_event(&self) {
        let mut state = self.state.lock();
        if !state.view_open {
            state.count += 1;
        }
    }

    /// The view became visible; resets the count on the closed -> open edge
    pub fn open_view(&self) {
        let mut state = self.state.lock();
        if !state.view_open {
            state.view_open = true;
            state.count = 0;
        }
    }

    pub fn close_view(&self) {
        self.state.lock().view_open = false;
    }

    pub fn count(&self) -> u64 {
        self.state.lock().count
    }

    pub fn is_view_open(&self) -> bool {
        self.state.lock().view_open
    }
}
