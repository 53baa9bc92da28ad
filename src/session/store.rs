//! Observable session store

use tokio::sync::watch;

use crate::types::{Identity, Session};

/// Holds the current session and notifies subscribers when it changes
pub struct SessionStore {
    tx: watch::Sender<Session>,
}

impl SessionStore {
    /// Create a signed-out store
    pub fn new() -> Self {
        Self::with_session(Session::default())
    }

    pub fn with_session(session: Session) -> Self {
        let (tx, _) = watch::channel(session);
        Self { tx }
    }

    /// Copy of the current session
    pub fn snapshot(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.tx.borrow().bound_token().map(str::to_owned)
    }

    pub fn current_user(&self) -> Option<Identity> {
        self.tx.borrow().current_user.clone()
    }

    /// Replace the session after a successful login
    pub fn sign_in(&self, token: impl Into<String>, user: Identity) {
        self.replace(Session::signed_in(token, user));
    }

    /// Clear token and user
    pub fn sign_out(&self) {
        self.replace(Session::default());
    }

    /// Swap only the token, keeping the current user
    pub fn set_token(&self, token: Option<String>) {
        self.tx.send_if_modified(|session| {
            if session.token == token {
                return false;
            }
            session.token = token;
            true
        });
    }

    fn replace(&self, next: Session) {
        self.tx.send_if_modified(|session| {
            if *session == next {
                return false;
            }
            *session = next;
            true
        });
    }

    /// Start observing token changes.
    ///
    /// The subscription starts at the current token; [`SessionSubscription::changed`]
    /// only resolves for later changes.
    pub fn subscribe(&self) -> SessionSubscription {
        let mut rx = self.tx.subscribe();
        let last = rx.borrow_and_update().bound_token().map(str::to_owned);
        SessionSubscription { rx, last }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle on a [`SessionStore`] that yields token changes.
///
/// Dropping the handle releases the subscription. Intermediate values written
/// faster than the holder observes them are coalesced: only the latest token
/// is reported.
pub struct SessionSubscription {
    rx: watch::Receiver<Session>,
    last: Option<String>,
}

/// The store was dropped; no further changes will arrive
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("session store closed")]
pub struct StoreClosed;

impl SessionSubscription {
    /// Token seen at subscription time or at the last reported change
    pub fn current_token(&self) -> Option<String> {
        self.last.clone()
    }

    /// Wait until the bound token differs from the last one reported.
    ///
    /// Changes that leave the token untouched (e.g. a refreshed user profile)
    /// are skipped. Cancel safe.
    pub async fn changed(&mut self) -> Result<Option<String>, StoreClosed> {
        loop {
            self.rx.changed().await.map_err(|_| StoreClosed)?;
            let token = self.rx.borrow_and_update().bound_token().map(str::to_owned);
            if token != self.last {
                self.last = token.clone();
                return Ok(token);
            }
        }
    }
}
