//! Scripted connector for connection manager tests.
//!
//! Every link it opens is fed from a channel held by a [`LinkHandle`], and every
//! open/close is appended to a shared log so tests can check ordering.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use live_feed::client::{Connector, Link, RawFrame};
use live_feed::ConnectionError;

/// What the next handshake does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    Accept,
    Fail,
    /// Never completes
    Hang,
}

/// Handshake, open and close entries, keyed by the URL the link was opened for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkLog {
    Attempted(String),
    Opened(String),
    Closed(String),
}

enum Input {
    Frame(RawFrame),
    Drop,
}

/// Test-side control of one opened link
#[derive(Clone)]
pub struct LinkHandle {
    pub url: String,
    input: mpsc::UnboundedSender<Input>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
    stalled: Arc<AtomicBool>,
}

impl LinkHandle {
    /// Queue a text frame as if the server pushed it
    pub fn push_text(&self, text: &str) {
        let _ = self.input.send(Input::Frame(RawFrame::Text(text.to_string())));
    }

    /// Queue an event frame `{type, data}`
    pub fn push_event(&self, kind: &str, data: serde_json::Value) {
        self.push_text(&serde_json::json!({ "type": kind, "data": data }).to_string());
    }

    /// Simulate the server closing the connection
    pub fn drop_connection(&self) {
        let _ = self.input.send(Input::Drop);
    }

    /// Text frames the client sent over this link
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Make every later write block forever, like a peer that stopped reading
    pub fn stall_sends(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Shared {
    plans: VecDeque<Plan>,
    attempts: Vec<String>,
    links: Vec<LinkHandle>,
    log: Vec<LinkLog>,
}

/// A connector whose handshakes follow a queued plan, accepting once it runs out
#[derive(Clone, Default)]
pub struct MockConnector {
    shared: Arc<Mutex<Shared>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue outcomes for the next handshakes
    pub fn plan(&self, plans: impl IntoIterator<Item = Plan>) {
        self.shared.lock().plans.extend(plans);
    }

    /// URLs of every handshake attempt, failed ones included
    pub fn attempts(&self) -> Vec<String> {
        self.shared.lock().attempts.clone()
    }

    /// Links opened so far, oldest first
    pub fn links(&self) -> Vec<LinkHandle> {
        self.shared.lock().links.clone()
    }

    pub fn link(&self, index: usize) -> LinkHandle {
        self.links()[index].clone()
    }

    /// Links not yet closed by the client
    pub fn open_links(&self) -> Vec<LinkHandle> {
        self.links().into_iter().filter(|link| !link.is_closed()).collect()
    }

    pub fn log(&self) -> Vec<LinkLog> {
        self.shared.lock().log.clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Link>, ConnectionError> {
        let plan = {
            let mut shared = self.shared.lock();
            shared.attempts.push(url.to_string());
            shared.log.push(LinkLog::Attempted(url.to_string()));
            shared.plans.pop_front().unwrap_or(Plan::Accept)
        };

        match plan {
            Plan::Accept => {}
            Plan::Fail => return Err(ConnectionError::Handshake("connection refused".to_string())),
            Plan::Hang => futures::future::pending::<()>().await,
        }

        let (input, rx) = mpsc::unbounded_channel();
        let handle = LinkHandle {
            url: url.to_string(),
            input,
            sent: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
            stalled: Arc::new(AtomicBool::new(false)),
        };
        let link = MockLink {
            url: url.to_string(),
            rx,
            sent: Arc::clone(&handle.sent),
            closed: Arc::clone(&handle.closed),
            stalled: Arc::clone(&handle.stalled),
            shared: Arc::clone(&self.shared),
        };

        let mut shared = self.shared.lock();
        shared.log.push(LinkLog::Opened(url.to_string()));
        shared.links.push(handle);
        Ok(Box::new(link))
    }
}

struct MockLink {
    url: String,
    rx: mpsc::UnboundedReceiver<Input>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
    stalled: Arc<AtomicBool>,
    shared: Arc<Mutex<Shared>>,
}

impl MockLink {
    fn mark_closed(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.shared.lock().log.push(LinkLog::Closed(self.url.clone()));
        }
    }
}

#[async_trait]
impl Link for MockLink {
    async fn next_frame(&mut self) -> Option<Result<RawFrame, ConnectionError>> {
        match self.rx.recv().await {
            Some(Input::Frame(frame)) => Some(Ok(frame)),
            Some(Input::Drop) | None => {
                self.mark_closed();
                None
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), ConnectionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ConnectionError::Send("link closed".to_string()));
        }
        if self.stalled.load(Ordering::SeqCst) {
            futures::future::pending::<()>().await;
        }
        self.sent.lock().push(text);
        Ok(())
    }

    async fn close(&mut self) {
        self.mark_closed();
    }
}

impl Drop for MockLink {
    fn drop(&mut self) {
        self.mark_closed();
    }
}
