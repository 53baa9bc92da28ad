//! Transport seam for the session connection
//!
//! The connection manager only talks to a [`Connector`] and the [`Link`]s it
//! opens. [`WsConnector`] is the production implementation on top of
//! tokio-tungstenite; tests substitute scripted links.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::ConnectionError;

/// One message received over a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFrame {
    Text(String),
    Binary(Vec<u8>),
}

/// Opens links to the hub
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Perform the handshake against `url`
    async fn connect(&self, url: &str) -> Result<Box<dyn Link>, ConnectionError>;
}

/// An open, ordered, bidirectional message channel
#[async_trait]
pub trait Link: Send {
    /// Next data frame in arrival order.
    ///
    /// Returns `None` once the peer closed the link. Must be cancel safe: the
    /// manager polls it inside `select!`.
    async fn next_frame(&mut self) -> Option<Result<RawFrame, ConnectionError>>;

    async fn send_text(&mut self, text: String) -> Result<(), ConnectionError>;

    /// Close the link; errors are irrelevant at this point and swallowed
    async fn close(&mut self);
}

/// Websocket connector backed by tokio-tungstenite
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Link>, ConnectionError> {
        let (stream, response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| ConnectionError::Handshake(e.to_string()))?;
        tracing::debug!(status = %response.status(), "websocket handshake complete");
        Ok(Box::new(WsLink { stream }))
    }
}

struct WsLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Link for WsLink {
    async fn next_frame(&mut self) -> Option<Result<RawFrame, ConnectionError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(RawFrame::Text(text.as_str().to_owned()))),
                Ok(Message::Binary(bytes)) => return Some(Ok(RawFrame::Binary(bytes.to_vec()))),
                Ok(Message::Close(frame)) => {
                    if let Some(frame) = frame {
                        tracing::info!(
                            code = u16::from(frame.code),
                            reason = frame.reason.as_str(),
                            "server closed connection"
                        );
                    }
                    return None;
                }
                // Pings are answered by tungstenite itself
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => continue,
                Err(e) => return Some(Err(ConnectionError::Transport(e.to_string()))),
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), ConnectionError> {
        self.stream
            .send(Message::text(text))
            .await
            .map_err(|e| ConnectionError::Send(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}
