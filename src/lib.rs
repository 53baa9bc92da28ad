//! Live Feed
//!
//! A realtime event notification pipeline for signed-in sessions, plus the
//! hub that serves it.
//!
//! # Features
//!
//! - **Session-bound connection**: one websocket per session token, rebound on
//!   every token change
//! - **Fan-out**: inbound events reach every subscriber in arrival order
//! - **History**: the 50 most recent events, newest first
//! - **Unread indicator**: events seen while the history view was closed
//! - **Test injector**: asks the hub to push a notification back to the session
//!
//! # Modules
//!
//! - `types`: Events, wire frames, session and status types
//! - `session`: Observable session store
//! - `client`: Connection manager, dispatcher, history, unread indicator, injector
//! - `api`: Axum hub serving the websocket and notification endpoints
//! - `config`: Client configuration from the environment
//! - `error`: Error types
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use live_feed::{FeedConfig, Identity, LiveFeed, SessionStore};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Arc::new(SessionStore::new());
//! let feed = LiveFeed::start(FeedConfig::from_env()?, Arc::clone(&session))?;
//!
//! feed.subscribe(|event| println!("{}: {}", event.kind(), event.payload()));
//! session.sign_in("token", Identity::new("user-id"));
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod types;

// Re-export commonly used items at crate root
pub use client::{
    ConnectionManager, EventDispatcher, EventHistory, InjectorStatus, LiveFeed, SubscriptionId,
    TestInjector, UnreadIndicator,
};
pub use config::{Environment, FeedConfig, ReconnectPolicy};
pub use error::{ConfigError, ConnectionError, DecodeError, FeedError, InjectError};
pub use session::SessionStore;
pub use types::{ConnectionStatus, Event, EventId, Identity, OutboundFrame, Session};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
