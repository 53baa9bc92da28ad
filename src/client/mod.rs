//! Client side of the realtime notification pipeline
//!
//! Data flows one way:
//! session store -> [`ConnectionManager`] -> raw frames -> [`EventDispatcher`]
//! -> { [`EventHistory`], [`UnreadIndicator`], other subscribers }.
//!
//! The [`TestInjector`] is a side channel: it asks the hub over HTTP to push an
//! event, which then arrives through the same connection as any other frame.

pub mod connection;
pub mod dispatcher;
pub mod endpoint;
pub mod feed;
pub mod history;
pub mod injector;
pub mod transport;
pub mod unread;

pub use connection::ConnectionManager;
pub use dispatcher::{decode_frame, DispatchStats, EventDispatcher, EventStream, SubscriptionId};
pub use feed::LiveFeed;
pub use history::{EventHistory, DEFAULT_HISTORY_CAPACITY, MAX_HISTORY_CAPACITY};
pub use injector::{InjectorStatus, TestInjector};
pub use transport::{Connector, Link, RawFrame, WsConnector};
pub use unread::UnreadIndicator;
