//! Notification hub: HTTP and WebSocket endpoints
//!
//! The server side of the feed. Signed-in clients hold a websocket bound to
//! their session token; the test-notification endpoint pushes to it.

pub mod auth;
pub mod http;
pub mod notifications;
pub mod websocket;

pub use auth::{AuthError, Claims, SharedTokenAuth, TokenAuth};
pub use http::{create_router, serve};
pub use websocket::HubState;
