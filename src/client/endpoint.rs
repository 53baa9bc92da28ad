//! Endpoint derivation
//!
//! The websocket endpoint carries the session token in its path so the hub can
//! bind the socket to a user. The scheme follows whether the application itself
//! is served over TLS.

use crate::config::FeedConfig;

/// Path prefix of the session websocket, followed by `/{token}`
pub const WS_PATH: &str = "/api/v1/ws";

/// Path prefix of the test-notification endpoint, followed by `/{user_id}`
pub const NOTIFICATION_PATH: &str = "/api/v1/notifications/webhook";

/// `ws://` or `wss://` URL bound to `token`
pub fn websocket_url(config: &FeedConfig, token: &str) -> String {
    let scheme = if config.secure { "wss" } else { "ws" };
    format!(
        "{}://{}{}/{}",
        scheme,
        config.ws_host(),
        WS_PATH,
        urlencoding::encode(token)
    )
}

/// URL the test injector posts to for `user_id`
pub fn notification_url(config: &FeedConfig, user_id: &str) -> String {
    format!(
        "{}{}/{}",
        config.api_base_url.trim_end_matches('/'),
        NOTIFICATION_PATH,
        urlencoding::encode(user_id)
    )
}
