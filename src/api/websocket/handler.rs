//! WebSocket connection handler

use std::borrow::Cow;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use tokio::sync::broadcast;

use super::events::{ClientFrame, PushMessage};
use super::state::HubState;

/// Close code sent when the path token does not verify
pub const INVALID_TOKEN_CLOSE_CODE: u16 = 4001;

/// WebSocket upgrade handler for `/api/v1/ws/:token`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(token): Path<String>,
    State(state): State<Arc<HubState>>,
) -> Response {
    match state.auth.verify(&token) {
        Ok(claims) => ws.on_upgrade(move |socket| handle_socket(socket, state, claims.sub)),
        Err(e) => {
            tracing::info!(error = %e, "rejecting websocket with invalid token");
            ws.on_upgrade(reject_socket)
        }
    }
}

/// Accept then immediately close, so clients see the close code
async fn reject_socket(mut socket: WebSocket) {
    let frame = CloseFrame {
        code: INVALID_TOKEN_CLOSE_CODE,
        reason: Cow::from("Invalid token"),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
}

/// Handle an individual WebSocket connection
async fn handle_socket(mut socket: WebSocket, state: Arc<HubState>, user_id: String) {
    let mut rx = state.join(&user_id);

    loop {
        tokio::select! {
            // Pushes for this user
            result = rx.recv() => {
                let msg = match result {
                    Ok(msg) => msg,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(user_id = %user_id, missed = n, "connection lagged");
                        PushMessage::lagged(n, state.current_sequence_id())
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if !send_json(&mut socket, &msg).await {
                    break; // Client disconnected
                }
            }

            // Frames from the client
            result = socket.recv() => {
                match result {
                    Some(Ok(msg)) => {
                        if !handle_client_message(msg, &mut socket, &state, &user_id).await {
                            break;
                        }
                    }
                    Some(Err(_)) => break, // WebSocket error
                    None => break,
                }
            }
        }
    }

    state.leave(&user_id, rx);
}

async fn send_json(socket: &mut WebSocket, msg: &PushMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => socket.send(Message::Text(json)).await.is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode push message");
            true
        }
    }
}

/// Handle a message from the client.
/// Returns false if the connection should be closed
async fn handle_client_message(
    msg: Message,
    socket: &mut WebSocket,
    state: &HubState,
    user_id: &str,
) -> bool {
    match msg {
        Message::Text(text) => {
            // Echo to every connection of the same user, this one included
            match serde_json::from_str::<ClientFrame>(&text) {
                Ok(frame) => {
                    state.publish(user_id, frame.kind, frame.data);
                }
                Err(e) => tracing::debug!(user_id, error = %e, "ignoring malformed client frame"),
            }
            true
        }
        Message::Binary(_) => true,
        Message::Ping(data) => {
            let _ = socket.send(Message::Pong(data)).await;
            true
        }
        Message::Pong(_) => true,
        Message::Close(_) => false,
    }
}
