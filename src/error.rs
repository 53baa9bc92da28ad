//! Error types for the client pipeline
//!
//! None of these are fatal to the host application: every failure degrades to
//! "no live updates" and recovery is driven by the session (a fresh sign-in).

use std::time::Duration;

/// Handshake or transport failure on the session connection
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("handshake timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to send frame: {0}")]
    Send(String),
}

/// An inbound frame that could not be turned into an event
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("frame body is not an object (found {0})")]
    NotAnObject(&'static str),
}

/// Failure of a test-notification request.
///
/// `Send` means the request never produced a response; `Rejected` means the
/// server answered with a non-success status and a reason.
#[derive(Debug, thiserror::Error)]
pub enum InjectError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("not signed in")]
    NotSignedIn,

    #[error("request failed to send: {0}")]
    Send(#[from] reqwest::Error),

    #[error("server rejected request ({status}): {reason}")]
    Rejected { status: u16, reason: String },
}

/// Invalid configuration value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown environment '{0}' (expected development or production)")]
    UnknownEnvironment(String),

    #[error("{name} must not be empty")]
    Empty { name: &'static str },

    #[error("history capacity {value} exceeds the maximum of {max}")]
    HistoryCapacity { value: usize, max: usize },
}

/// Failure to assemble a [`LiveFeed`](crate::client::LiveFeed)
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
