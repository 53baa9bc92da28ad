//! Hub state: one broadcast channel per connected user

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::broadcast;

use super::events::{PushMessage, DEFAULT_CHANNEL};
use crate::api::auth::SharedTokenAuth;

/// Messages buffered per user before slow connections start lagging
const CHANNEL_CAPACITY: usize = 1024;

/// Shared application state for the hub
pub struct HubState {
    /// Token issuer/validator
    pub auth: SharedTokenAuth,

    /// user id -> sender reaching every connection of that user
    channels: RwLock<HashMap<String, broadcast::Sender<PushMessage>>>,

    /// Monotonically increasing sequence counter
    sequence_counter: AtomicU64,
}

impl HubState {
    pub fn new(auth: SharedTokenAuth) -> Self {
        Self {
            auth,
            channels: RwLock::new(HashMap::new()),
            sequence_counter: AtomicU64::new(0),
        }
    }

    /// Register a connection for `user_id` and return its receiver
    pub fn join(&self, user_id: &str) -> broadcast::Receiver<PushMessage> {
        let mut channels = self.channels.write();
        let tx = channels
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        let rx = tx.subscribe();
        tracing::info!(user_id, connections = tx.receiver_count(), "connection joined");
        rx
    }

    /// Unregister a connection; the user's channel goes away with its last one
    pub fn leave(&self, user_id: &str, rx: broadcast::Receiver<PushMessage>) {
        drop(rx);
        let mut channels = self.channels.write();
        if let Some(tx) = channels.get(user_id) {
            let remaining = tx.receiver_count();
            if remaining == 0 {
                channels.remove(user_id);
            }
            tracing::info!(user_id, connections = remaining, "connection left");
        }
    }

    /// Push a message to every connection of `user_id`.
    ///
    /// Returns the number of connections reached.
    pub fn publish(&self, user_id: &str, kind: Option<String>, data: Value) -> usize {
        let msg = PushMessage {
            kind,
            data,
            channel: DEFAULT_CHANNEL.to_string(),
            sequence_id: self.next_sequence_id(),
            timestamp: chrono::Utc::now().timestamp(),
        };

        let delivered = match self.channels.read().get(user_id) {
            // Errors just mean no receivers are listening
            Some(tx) => tx.send(msg).unwrap_or(0),
            None => 0,
        };
        tracing::debug!(user_id, delivered, "published to user");
        delivered
    }

    /// Number of open connections for `user_id`
    pub fn connection_count(&self, user_id: &str) -> usize {
        self.channels
            .read()
            .get(user_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Number of users with at least one connection
    pub fn active_users(&self) -> usize {
        self.channels.read().len()
    }

    pub fn next_sequence_id(&self) -> u64 {
        self.sequence_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Get the current sequence ID
    pub fn current_sequence_id(&self) -> u64 {
        self.sequence_counter.load(Ordering::SeqCst)
    }
}
