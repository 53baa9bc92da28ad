//! Test-notification endpoint
//!
//! `POST /api/v1/notifications/webhook/:user_id` pushes the request body to the
//! user's connections as a `webhook.notification` event. The bearer token must
//! belong to the same user.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use super::auth::AuthError;
use super::websocket::{HubState, WEBHOOK_NOTIFICATION};

#[derive(Debug, Serialize)]
pub struct Delivered {
    pub status: &'static str,
    /// Connections the notification was pushed to
    pub delivered: usize,
}

/// Error body, `{"detail": "..."}`
#[derive(Debug, Serialize)]
struct Detail {
    detail: String,
}

#[derive(Debug)]
pub enum NotifyError {
    Auth(AuthError),
    BadRequest(String),
}

impl IntoResponse for NotifyError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            NotifyError::Auth(AuthError::Forbidden) => (StatusCode::FORBIDDEN, AuthError::Forbidden.to_string()),
            NotifyError::Auth(e) => (StatusCode::UNAUTHORIZED, e.to_string()),
            NotifyError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
        };
        (status, Json(Detail { detail })).into_response()
    }
}

pub async fn push_notification(
    Path(user_id): Path<String>,
    State(state): State<Arc<HubState>>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Delivered>, NotifyError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(NotifyError::Auth(AuthError::MissingToken))?;
    let claims = state.auth.verify_authorization(header).map_err(NotifyError::Auth)?;
    if claims.sub != user_id {
        tracing::warn!(user_id = %user_id, sub = %claims.sub, "notification for another user refused");
        return Err(NotifyError::Auth(AuthError::Forbidden));
    }

    let Json(payload) = body.map_err(|e| NotifyError::BadRequest(e.body_text()))?;
    let delivered = state.publish(&user_id, Some(WEBHOOK_NOTIFICATION.to_string()), payload);
    tracing::info!(user_id = %user_id, delivered, "test notification pushed");

    Ok(Json(Delivered {
        status: "success",
        delivered,
    }))
}
