//! Event dispatcher
//!
//! Decodes raw frames into [`Event`]s and publishes each one to every registered
//! subscriber, synchronously and in arrival order. Subscribers run one after the
//! other on the caller's task; none runs concurrently with another for the same
//! event, and the next frame is not decoded until every subscriber has returned.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;

use super::transport::RawFrame;
use crate::error::DecodeError;
use crate::types::{Event, InboundFrame};

/// Subscriber callback
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Token returned by [`EventDispatcher::subscribe`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Counters for published and rejected frames
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub published: u64,
    pub rejected: u64,
}

/// Publish-subscribe hub for decoded events
pub struct EventDispatcher {
    subscribers: RwLock<Vec<(SubscriptionId, Handler)>>,
    next_id: AtomicU64,
    latest: RwLock<Option<Event>>,
    published: AtomicU64,
    rejected: AtomicU64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
            latest: RwLock::new(None),
            published: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Register `handler`; it receives every event published from now on
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, Arc::new(handler)));
        id
    }

    /// Remove a subscriber. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Decode `frame` and publish the resulting event.
    ///
    /// A frame that fails to decode is counted, logged and dropped; subscribers
    /// never see it.
    pub fn dispatch(&self, frame: &RawFrame) -> Result<(), DecodeError> {
        match decode_frame(frame) {
            Ok(event) => {
                self.publish(event);
                Ok(())
            }
            Err(e) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "dropping undecodable frame");
                Err(e)
            }
        }
    }

    /// Deliver `event` to every current subscriber in registration order.
    ///
    /// The connection manager is the only production caller. Calling it directly
    /// bypasses the server round trip and is meant for local debugging tools.
    pub fn publish(&self, event: Event) {
        tracing::debug!(id = %event.id(), kind = event.kind(), "publishing event");
        *self.latest.write() = Some(event.clone());
        self.published.fetch_add(1, Ordering::Relaxed);

        // Snapshot so handlers may subscribe or unsubscribe without deadlocking
        let handlers: Vec<Handler> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler(&event);
        }
    }

    /// Most recently published event
    pub fn latest(&self) -> Option<Event> {
        self.latest.read().clone()
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            published: self.published.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    /// Subscribe with an async stream instead of a callback.
    ///
    /// Events are queued without bound so the dispatch path never waits on the
    /// consumer. Dropping the stream unsubscribes.
    pub fn stream(self: &Arc<Self>) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.subscribe(move |event| {
            let _ = tx.send(event.clone());
        });
        EventStream {
            inner: UnboundedReceiverStream::new(rx),
            id,
            dispatcher: Arc::downgrade(self),
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode one frame body into an event stamped at receipt time
pub fn decode_frame(frame: &RawFrame) -> Result<Event, DecodeError> {
    let value: Value = match frame {
        RawFrame::Text(text) => serde_json::from_str(text)?,
        RawFrame::Binary(bytes) => serde_json::from_slice(bytes)?,
    };
    if !value.is_object() {
        return Err(DecodeError::NotAnObject(json_type_name(&value)));
    }
    let frame: InboundFrame = serde_json::from_value(value)?;
    Ok(frame.into_event())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Async view of a dispatcher subscription
pub struct EventStream {
    inner: UnboundedReceiverStream<Event>,
    id: SubscriptionId,
    dispatcher: Weak<EventDispatcher>,
}

impl Stream for EventStream {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Event>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        if let Some(dispatcher) = self.dispatcher.upgrade() {
            dispatcher.unsubscribe(self.id);
        }
    }
}
