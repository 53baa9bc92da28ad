//! Data types for the live feed
//!
//! This module contains the data structures shared by the client pipeline and the hub.

mod event;
mod session;
mod status;

pub use event::{Event, EventId, InboundFrame, OutboundFrame, DEFAULT_EVENT_KIND};
pub use session::{Identity, Session};
pub use status::ConnectionStatus;
