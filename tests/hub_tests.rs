//! End-to-end tests: the hub on a real socket, driven by the real client

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

use common::wait_until;
use live_feed::api::{self, HubState, TokenAuth};
use live_feed::{
    ConnectionStatus, FeedConfig, Identity, InjectError, InjectorStatus, LiveFeed, OutboundFrame,
    SessionStore,
};

const SECRET: &str = "test-secret-key-that-is-at-least-32-characters-long";

async fn start_hub() -> (SocketAddr, Arc<HubState>) {
    let auth = TokenAuth::new(SECRET).unwrap();
    let state = Arc::new(HubState::new(Arc::new(auth)));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(api::serve(listener, Arc::clone(&state)));
    (addr, state)
}

fn feed_for(addr: SocketAddr) -> (LiveFeed, Arc<SessionStore>) {
    let session = Arc::new(SessionStore::new());
    let feed = LiveFeed::start(FeedConfig::for_host(addr.to_string()), Arc::clone(&session)).unwrap();
    (feed, session)
}

/// Sign `user` in and wait until the hub has registered the socket
async fn sign_in(feed: &LiveFeed, session: &SessionStore, state: &HubState, user: &str) {
    let before = state.connection_count(user);
    let token = state.auth.issue(user).unwrap();
    session.sign_in(token, Identity::new(user));
    timeout(
        Duration::from_secs(2),
        feed.connection().wait_for(ConnectionStatus::Connected),
    )
    .await
    .unwrap();
    wait_until("hub registration", || state.connection_count(user) == before + 1).await;
}

#[tokio::test]
async fn test_test_notification_round_trip() {
    let (addr, state) = start_hub().await;
    let (feed, session) = feed_for(addr);
    sign_in(&feed, &session, &state, "u-1").await;

    feed.send_test_notification("hello").await.unwrap();
    assert_eq!(feed.injector().status(), InjectorStatus::Sent);

    wait_until("notification event", || feed.history().len() == 1).await;
    let event = feed.history().latest().unwrap();
    assert_eq!(event.kind(), "webhook.notification");
    assert_eq!(event.payload()["message"], "hello");
    assert_eq!(feed.unread().count(), 1);
}

#[tokio::test]
async fn test_notification_for_other_user_is_rejected() {
    let (addr, state) = start_hub().await;
    let (feed, session) = feed_for(addr);

    // Token for u-1, identity claiming u-2
    let token = state.auth.issue("u-1").unwrap();
    session.sign_in(token, Identity::new("u-2"));

    let err = feed.send_test_notification("hello").await.unwrap_err();
    assert!(matches!(err, InjectError::Rejected { status: 403, ref reason } if reason == "Not authorized"));
}

#[tokio::test]
async fn test_sent_frames_are_echoed_back() {
    let (addr, state) = start_hub().await;
    let (feed, session) = feed_for(addr);
    sign_in(&feed, &session, &state, "u-1").await;

    assert!(feed.send(&OutboundFrame::new("chat", json!({"text": "hi"}))));

    wait_until("echo", || feed.history().len() == 1).await;
    let event = feed.last_event().unwrap();
    assert_eq!(event.kind(), "chat");
    assert_eq!(event.payload()["text"], "hi");
}

#[tokio::test]
async fn test_every_connection_of_user_receives() {
    let (addr, state) = start_hub().await;
    let (first, first_session) = feed_for(addr);
    let (second, second_session) = feed_for(addr);
    let (other, other_session) = feed_for(addr);
    sign_in(&first, &first_session, &state, "u-1").await;
    sign_in(&second, &second_session, &state, "u-1").await;
    sign_in(&other, &other_session, &state, "u-2").await;

    first.send_test_notification("to both").await.unwrap();

    wait_until("first copy", || first.history().len() == 1).await;
    wait_until("second copy", || second.history().len() == 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(other.history().is_empty());
}

#[tokio::test]
async fn test_token_swap_moves_connection_to_new_user() {
    let (addr, state) = start_hub().await;
    let (feed, session) = feed_for(addr);
    sign_in(&feed, &session, &state, "u-1").await;

    sign_in(&feed, &session, &state, "u-2").await;
    wait_until("old socket released", || state.connection_count("u-1") == 0).await;

    assert_eq!(state.publish("u-1", Some("old".to_string()), json!({})), 0);
    feed.send_test_notification("for u-2").await.unwrap();
    wait_until("event for new user", || feed.history().len() == 1).await;
    assert_eq!(feed.history().latest().unwrap().payload()["message"], "for u-2");
}

#[tokio::test]
async fn test_sign_out_releases_hub_connection() {
    let (addr, state) = start_hub().await;
    let (feed, session) = feed_for(addr);
    sign_in(&feed, &session, &state, "u-1").await;

    session.sign_out();
    wait_until("socket released", || state.connection_count("u-1") == 0).await;
    assert_eq!(state.active_users(), 0);
    assert_eq!(feed.status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn test_invalid_token_is_closed_with_4001() {
    let (addr, _state) = start_hub().await;
    let url = format!("ws://{}/api/v1/ws/not-a-token", addr);

    let (mut socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    let msg = timeout(Duration::from_secs(2), socket.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    match msg {
        Message::Close(Some(frame)) => {
            assert_eq!(u16::from(frame.code), 4001);
            assert_eq!(frame.reason.as_str(), "Invalid token");
        }
        other => panic!("expected close frame, got {:?}", other),
    }
}

#[tokio::test]
async fn test_client_with_invalid_token_ends_disconnected() {
    let (addr, _state) = start_hub().await;
    let (feed, session) = feed_for(addr);

    session.sign_in("not-a-token", Identity::new("u-1"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    timeout(
        Duration::from_secs(2),
        feed.connection().wait_for(ConnectionStatus::Disconnected),
    )
    .await
    .unwrap();
    assert!(feed.history().is_empty());
}
