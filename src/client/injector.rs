//! Outbound test injector
//!
//! Asks the hub to push one `webhook.notification` event to the signed-in user.
//! Only the HTTP request is reported here; whether the event comes back over the
//! session connection is observed through the history.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::endpoint::notification_url;
use crate::config::FeedConfig;
use crate::error::InjectError;
use crate::session::SessionStore;

/// Reason shown when the server rejects without a `detail`
const DEFAULT_REJECTION: &str = "Failed to send webhook";

/// Outcome of the last request, for display
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InjectorStatus {
    #[default]
    Idle,
    Sent,
    SendFailed(String),
    Rejected { status: u16, reason: String },
}

#[derive(Serialize)]
struct TestNotification<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// Sends authenticated test-notification requests
pub struct TestInjector {
    http: reqwest::Client,
    config: Arc<FeedConfig>,
    session: Arc<SessionStore>,
    status: Mutex<InjectorStatus>,
}

impl TestInjector {
    pub fn new(config: Arc<FeedConfig>, session: Arc<SessionStore>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            config,
            session,
            status: Mutex::new(InjectorStatus::Idle),
        })
    }

    /// Outcome of the most recent request actually issued.
    ///
    /// Attempts refused locally (blank message, signed out) never reach the
    /// server and leave the status as it was.
    pub fn status(&self) -> InjectorStatus {
        self.status.lock().clone()
    }

    /// Post `message` as a test notification for the current user.
    ///
    /// Blank messages and signed-out sessions are refused without a request.
    pub async fn send(&self, message: &str) -> Result<(), InjectError> {
        if message.trim().is_empty() {
            return Err(InjectError::EmptyMessage);
        }
        let session = self.session.snapshot();
        let (Some(token), Some(user)) = (session.bound_token(), session.current_user.as_ref()) else {
            return Err(InjectError::NotSignedIn);
        };

        let result = self.post(token, &user.id, message).await;
        *self.status.lock() = match &result {
            Ok(()) => InjectorStatus::Sent,
            Err(InjectError::Rejected { status, reason }) => InjectorStatus::Rejected {
                status: *status,
                reason: reason.clone(),
            },
            Err(e) => InjectorStatus::SendFailed(e.to_string()),
        };
        result
    }

    async fn post(&self, token: &str, user_id: &str, message: &str) -> Result<(), InjectError> {
        let url = notification_url(&self.config, user_id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&TestNotification { message })
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "test notification request failed");
                InjectError::Send(e)
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(user_id, "test notification accepted");
            return Ok(());
        }

        let reason = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.detail)
            .unwrap_or_else(|| DEFAULT_REJECTION.to_string());
        tracing::warn!(status = status.as_u16(), %reason, "test notification rejected");
        Err(InjectError::Rejected {
            status: status.as_u16(),
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Identity;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn injector_for(server_uri: &str, session: Arc<SessionStore>) -> TestInjector {
        let config = FeedConfig {
            api_base_url: server_uri.to_string(),
            ..FeedConfig::default()
        };
        TestInjector::new(Arc::new(config), session).unwrap()
    }

    fn signed_in() -> Arc<SessionStore> {
        let store = SessionStore::new();
        store.sign_in("tok-1", Identity::new("u-1"));
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_successful_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/notifications/webhook/u-1"))
            .and(header("authorization", "Bearer tok-1"))
            .and(body_json(json!({"message": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
            .expect(1)
            .mount(&server)
            .await;

        let injector = injector_for(&server.uri(), signed_in());
        injector.send("hello").await.unwrap();
        assert_eq!(injector.status(), InjectorStatus::Sent);
    }

    #[tokio::test]
    async fn test_rejection_carries_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"detail": "Not authorized"})))
            .mount(&server)
            .await;

        let injector = injector_for(&server.uri(), signed_in());
        let err = injector.send("hello").await.unwrap_err();
        assert!(matches!(err, InjectError::Rejected { status: 403, ref reason } if reason == "Not authorized"));
        assert_eq!(
            injector.status(),
            InjectorStatus::Rejected {
                status: 403,
                reason: "Not authorized".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_rejection_without_detail_uses_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let injector = injector_for(&server.uri(), signed_in());
        let err = injector.send("hello").await.unwrap_err();
        assert!(matches!(err, InjectError::Rejected { status: 500, ref reason } if reason == DEFAULT_REJECTION));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_send_failure() {
        // Port 9 (discard) is closed on test machines
        let injector = injector_for("http://127.0.0.1:9", signed_in());
        let err = injector.send("hello").await.unwrap_err();
        assert!(matches!(err, InjectError::Send(_)));
        assert!(matches!(injector.status(), InjectorStatus::SendFailed(_)));
    }

    #[tokio::test]
    async fn test_blank_message_and_signed_out_are_refused() {
        let injector = injector_for("http://127.0.0.1:9", signed_in());
        assert!(matches!(injector.send("   ").await, Err(InjectError::EmptyMessage)));

        let injector = injector_for("http://127.0.0.1:9", Arc::new(SessionStore::new()));
        assert!(matches!(injector.send("hi").await, Err(InjectError::NotSignedIn)));
        assert_eq!(injector.status(), InjectorStatus::Idle);
    }

    #[tokio::test]
    async fn test_refused_attempt_keeps_last_request_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let session = signed_in();
        let injector = injector_for(&server.uri(), Arc::clone(&session));
        injector.send("hello").await.unwrap();

        assert!(matches!(injector.send("  ").await, Err(InjectError::EmptyMessage)));
        session.sign_out();
        assert!(matches!(injector.send("hello").await, Err(InjectError::NotSignedIn)));
        assert_eq!(injector.status(), InjectorStatus::Sent);
    }
}
