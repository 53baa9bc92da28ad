//! WebSocket endpoint pushing notifications to signed-in users
//!
//! Each connection authenticates with the session token in its path and joins
//! the broadcast channel of the token's user. Frames sent by a client are
//! pushed back to every connection of that user.

pub mod events;
pub mod handler;
pub mod state;

pub use events::{ClientFrame, PushMessage, WEBHOOK_NOTIFICATION};
pub use handler::{ws_handler, INVALID_TOKEN_CLOSE_CODE};
pub use state::HubState;
