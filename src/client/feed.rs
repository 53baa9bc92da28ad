//! Live feed facade
//!
//! Wires the pipeline for one session store: the connection manager feeds the
//! dispatcher, and the history and unread indicator are registered as its
//! first two subscribers, so both observe events in publish order.

use std::sync::Arc;

use super::connection::ConnectionManager;
use super::dispatcher::{EventDispatcher, EventStream, SubscriptionId};
use super::history::EventHistory;
use super::injector::TestInjector;
use super::transport::{Connector, WsConnector};
use super::unread::UnreadIndicator;
use crate::config::FeedConfig;
use crate::error::{FeedError, InjectError};
use crate::session::SessionStore;
use crate::types::{ConnectionStatus, Event, OutboundFrame};

/// The realtime notification pipeline for one session
pub struct LiveFeed {
    session: Arc<SessionStore>,
    dispatcher: Arc<EventDispatcher>,
    history: Arc<EventHistory>,
    unread: Arc<UnreadIndicator>,
    connection: ConnectionManager,
    injector: TestInjector,
}

impl LiveFeed {
    /// Start the pipeline over real websockets.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: FeedConfig, session: Arc<SessionStore>) -> Result<Self, FeedError> {
        Self::with_connector(config, session, Arc::new(WsConnector))
    }

    /// Start the pipeline over a custom transport
    pub fn with_connector(
        config: FeedConfig,
        session: Arc<SessionStore>,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, FeedError> {
        config.validate()?;
        let config = Arc::new(config);

        let dispatcher = Arc::new(EventDispatcher::new());
        let history = Arc::new(EventHistory::new(config.history_capacity));
        let unread = Arc::new(UnreadIndicator::new());
        history.attach(&dispatcher);
        unread.attach(&dispatcher);

        let injector = TestInjector::new(Arc::clone(&config), Arc::clone(&session))?;
        let connection = ConnectionManager::spawn(
            Arc::clone(&config),
            &session,
            connector,
            Arc::clone(&dispatcher),
        );

        Ok(Self {
            session,
            dispatcher,
            history,
            unread,
            connection,
            injector,
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    pub fn history(&self) -> &Arc<EventHistory> {
        &self.history
    }

    pub fn unread(&self) -> &Arc<UnreadIndicator> {
        &self.unread
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn injector(&self) -> &TestInjector {
        &self.injector
    }

    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Most recently received event
    pub fn last_event(&self) -> Option<Event> {
        self.dispatcher.latest()
    }

    /// Send over the open connection; no-op when not connected
    pub fn send(&self, frame: &OutboundFrame) -> bool {
        self.connection.send(frame)
    }

    /// Register an additional subscriber
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.dispatcher.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.dispatcher.unsubscribe(id)
    }

    pub fn events(&self) -> EventStream {
        self.dispatcher.stream()
    }

    /// Ask the hub to push a test notification back to this session
    pub async fn send_test_notification(&self, message: &str) -> Result<(), InjectError> {
        self.injector.send(message).await
    }

    /// Close the connection and stop observing the session
    pub async fn shutdown(&self) {
        self.connection.shutdown().await;
    }
}
