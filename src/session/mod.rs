//! Session token source
//!
//! The authentication layer owns the session; the live feed only observes it.
//! A [`SessionStore`] is handed to the connection manager by reference, which
//! holds a [`SessionSubscription`] for as long as its driver task runs.

mod store;

pub use store::{SessionStore, SessionSubscription, StoreClosed};
