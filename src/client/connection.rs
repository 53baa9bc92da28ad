//! Connection manager
//!
//! Owns the single session connection. A driver task observes the session
//! store and, on every token change, closes the current link before opening a
//! new one bound to the new token (or staying disconnected when the token is
//! gone). Inbound frames are dispatched from the same task, so one frame is fully
//! fanned out before the next is read, and a link that has been replaced is never
//! read again.
//!
//! ## States
//! - `Idle`: no token, or the link for the current token is gone (`disconnected`)
//! - `Connecting`: handshake in flight (`connecting`)
//! - `Open`: frames are being dispatched (`connected`)
//! - `Backoff`: waiting before a reconnect attempt, only with a [`ReconnectPolicy`]
//!   that allows it (`disconnected`)
//!
//! [`ReconnectPolicy`]: crate::config::ReconnectPolicy

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::dispatcher::EventDispatcher;
use super::endpoint::websocket_url;
use super::transport::{Connector, Link};
use crate::config::FeedConfig;
use crate::error::ConnectionError;
use crate::session::{SessionStore, SessionSubscription};
use crate::types::{ConnectionStatus, OutboundFrame};

/// Upper bound on a graceful close before the link is simply dropped
const CLOSE_GRACE: Duration = Duration::from_secs(2);

enum Command {
    Send(String),
    Shutdown,
}

/// Handle on the session connection.
///
/// Dropping the handle aborts the driver task, which drops any open link; call
/// [`shutdown`](Self::shutdown) for a graceful close.
pub struct ConnectionManager {
    status: watch::Receiver<ConnectionStatus>,
    commands: mpsc::UnboundedSender<Command>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    /// Start observing `session` and managing the connection.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(
        config: Arc<FeedConfig>,
        session: &SessionStore,
        connector: Arc<dyn Connector>,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let driver = Driver {
            config,
            connector,
            dispatcher,
            session: session.subscribe(),
            commands: command_rx,
            status: status_tx,
        };
        let task = tokio::spawn(driver.run());

        Self {
            status: status_rx,
            commands: command_tx,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    /// Receiver that observes every status transition
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Wait until the status equals `wanted`
    pub async fn wait_for(&self, wanted: ConnectionStatus) -> ConnectionStatus {
        let mut rx = self.status.clone();
        let status = match rx.wait_for(|status| *status == wanted).await {
            Ok(status) => *status,
            // Driver is gone; nothing is connected any more
            Err(_) => ConnectionStatus::Disconnected,
        };
        status
    }

    /// Queue `frame` on the open connection.
    ///
    /// No-op returning `false` when not connected. A frame queued just as the
    /// link drops is discarded by the driver.
    pub fn send(&self, frame: &OutboundFrame) -> bool {
        if !self.is_connected() {
            tracing::debug!("not connected, outbound frame discarded");
            return false;
        }
        match serde_json::to_string(frame) {
            Ok(text) => self.commands.send(Command::Send(text)).is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode outbound frame");
                false
            }
        }
    }

    /// Close the connection and stop observing the session
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

enum State {
    Idle,
    Connecting { token: String, attempt: u32 },
    Open { token: String, link: Box<dyn Link> },
    Backoff { token: String, attempt: u32, delay: Duration },
    Stopped,
}

impl State {
    fn for_token(token: Option<String>) -> Self {
        match token {
            Some(token) => State::Connecting { token, attempt: 0 },
            None => State::Idle,
        }
    }
}

/// Outcome of waiting on the session and command channels
enum Wake {
    Token(Option<String>),
    Shutdown,
}

struct Driver {
    config: Arc<FeedConfig>,
    connector: Arc<dyn Connector>,
    dispatcher: Arc<EventDispatcher>,
    session: SessionSubscription,
    commands: mpsc::UnboundedReceiver<Command>,
    status: watch::Sender<ConnectionStatus>,
}

impl Driver {
    async fn run(mut self) {
        let mut state = State::for_token(self.session.current_token());
        loop {
            state = match state {
                State::Idle => {
                    self.set_status(ConnectionStatus::Disconnected);
                    self.idle().await
                }
                State::Connecting { token, attempt } => {
                    self.set_status(ConnectionStatus::Connecting);
                    self.connect(token, attempt).await
                }
                State::Open { token, link } => {
                    self.set_status(ConnectionStatus::Connected);
                    self.serve(token, link).await
                }
                State::Backoff { token, attempt, delay } => {
                    self.set_status(ConnectionStatus::Disconnected);
                    self.backoff(token, attempt, delay).await
                }
                State::Stopped => break,
            };
        }
        self.set_status(ConnectionStatus::Disconnected);
        tracing::debug!("connection driver stopped");
    }

    fn set_status(&self, next: ConnectionStatus) {
        self.status.send_if_modified(|status| {
            if *status == next {
                return false;
            }
            tracing::debug!(from = %status, to = %next, "connection status");
            *status = next;
            true
        });
    }

    /// Wait for a token change, discarding outbound frames meanwhile
    async fn wait_for_wake(&mut self) -> Wake {
        loop {
            tokio::select! {
                biased;
                changed = self.session.changed() => {
                    return match changed {
                        Ok(token) => Wake::Token(token),
                        Err(_) => Wake::Shutdown,
                    };
                }
                command = self.commands.recv() => match command {
                    Some(Command::Send(_)) => tracing::debug!("not connected, outbound frame discarded"),
                    Some(Command::Shutdown) | None => return Wake::Shutdown,
                },
            }
        }
    }

    async fn idle(&mut self) -> State {
        match self.wait_for_wake().await {
            Wake::Token(token) => self.rebind(token),
            Wake::Shutdown => State::Stopped,
        }
    }

    fn rebind(&self, token: Option<String>) -> State {
        match &token {
            Some(_) => tracing::info!("session token changed, rebinding connection"),
            None => tracing::info!("session token cleared, staying disconnected"),
        }
        State::for_token(token)
    }

    async fn connect(&mut self, token: String, attempt: u32) -> State {
        let url = websocket_url(&self.config, &token);
        let connect_timeout = self.config.connect_timeout;
        let connector = Arc::clone(&self.connector);
        let handshake = tokio::time::timeout(connect_timeout, async move {
            connector.connect(&url).await
        });
        tokio::pin!(handshake);

        loop {
            tokio::select! {
                biased;
                changed = self.session.changed() => {
                    // Dropping the handshake future abandons the half-open socket
                    return match changed {
                        Ok(next) => self.rebind(next),
                        Err(_) => State::Stopped,
                    };
                }
                command = self.commands.recv() => match command {
                    Some(Command::Send(_)) => tracing::debug!("connecting, outbound frame discarded"),
                    Some(Command::Shutdown) | None => return State::Stopped,
                },
                result = &mut handshake => {
                    let error = match result {
                        Ok(Ok(link)) => {
                            tracing::info!(attempt, "connection open");
                            return State::Open { token, link };
                        }
                        Ok(Err(e)) => e,
                        Err(_) => ConnectionError::Timeout(connect_timeout),
                    };
                    tracing::warn!(error = %error, attempt, "connection failed");
                    return self.after_drop(token, attempt);
                }
            }
        }
    }

    async fn serve(&mut self, token: String, mut link: Box<dyn Link>) -> State {
        loop {
            // Session changes win over pending frames: once the token moved on,
            // nothing more is read from this link.
            tokio::select! {
                biased;
                changed = self.session.changed() => {
                    close_link(link.as_mut()).await;
                    tracing::info!("connection closed for token change");
                    return match changed {
                        Ok(next) => self.rebind(next),
                        Err(_) => State::Stopped,
                    };
                }
                command = self.commands.recv() => match command {
                    Some(Command::Send(text)) => {
                        // A stalled write must not hide a session change
                        let send_timeout = self.config.send_timeout;
                        let outcome = tokio::select! {
                            biased;
                            changed = self.session.changed() => Err(Some(changed)),
                            result = tokio::time::timeout(send_timeout, link.send_text(text)) => match result {
                                Ok(Ok(())) => Ok(()),
                                Ok(Err(e)) => {
                                    tracing::warn!(error = %e, "connection lost while sending");
                                    Err(None)
                                }
                                Err(_) => {
                                    tracing::warn!(timeout = ?send_timeout, "send stalled, dropping connection");
                                    Err(None)
                                }
                            },
                        };
                        match outcome {
                            Ok(()) => {}
                            Err(Some(changed)) => {
                                close_link(link.as_mut()).await;
                                tracing::info!("connection closed for token change during send");
                                return match changed {
                                    Ok(next) => self.rebind(next),
                                    Err(_) => State::Stopped,
                                };
                            }
                            Err(None) => {
                                close_link(link.as_mut()).await;
                                return self.after_drop(token, 0);
                            }
                        }
                    }
                    Some(Command::Shutdown) | None => {
                        close_link(link.as_mut()).await;
                        tracing::info!("connection closed on shutdown");
                        return State::Stopped;
                    }
                },
                frame = link.next_frame() => match frame {
                    Some(Ok(frame)) => {
                        // Decode failures are logged and counted by the dispatcher
                        let _ = self.dispatcher.dispatch(&frame);
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "connection lost");
                        close_link(link.as_mut()).await;
                        return self.after_drop(token, 0);
                    }
                    None => {
                        tracing::info!("connection closed by server");
                        return self.after_drop(token, 0);
                    }
                },
            }
        }
    }

    /// Next state after the link for `token` failed or closed.
    ///
    /// `attempt` counts consecutive failures since the last successful open.
    fn after_drop(&self, token: String, attempt: u32) -> State {
        match self.config.reconnect.delay_for(attempt) {
            Some(delay) => State::Backoff {
                token,
                attempt: attempt + 1,
                delay,
            },
            None => {
                if self.config.reconnect.is_enabled() {
                    tracing::warn!(attempts = attempt, "giving up reconnecting until the session changes");
                }
                State::Idle
            }
        }
    }

    async fn backoff(&mut self, token: String, attempt: u32, delay: Duration) -> State {
        tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "reconnecting after backoff");
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                biased;
                changed = self.session.changed() => {
                    return match changed {
                        Ok(next) => self.rebind(next),
                        Err(_) => State::Stopped,
                    };
                }
                command = self.commands.recv() => match command {
                    Some(Command::Send(_)) => tracing::debug!("reconnecting, outbound frame discarded"),
                    Some(Command::Shutdown) | None => return State::Stopped,
                },
                _ = &mut sleep => return State::Connecting { token, attempt },
            }
        }
    }
}

async fn close_link(link: &mut dyn Link) {
    if tokio::time::timeout(CLOSE_GRACE, link.close()).await.is_err() {
        tracing::debug!("close did not complete in time, dropping link");
    }
}
