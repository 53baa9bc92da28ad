//! JWT session tokens for the notification hub
//!
//! The token's subject is the user id; the hub uses it to pick the user's
//! broadcast channel when a websocket connects and to authorize test
//! notifications.
//!
//! ## Usage
//! ```bash
//! LIVE_FEED_JWT_SECRET=your-super-secret-key-at-least-32-chars live-feed serve
//! LIVE_FEED_JWT_SECRET=... live-feed token --user 42
//! ```

use std::sync::Arc;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Minimum accepted secret length
const MIN_SECRET_LEN: usize = 32;

/// JWT claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: impl Into<String>, ttl_seconds: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.into(),
            iat: now,
            exp: now + ttl_seconds,
        }
    }

    pub fn is_expired(&self) -> bool {
        chrono::Utc::now().timestamp() > self.exp
    }
}

/// Authentication errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid secret: {0}")]
    InvalidSecret(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Missing authentication token")]
    MissingToken,

    #[error("Not authorized")]
    Forbidden,
}

/// Issues and validates session tokens
pub struct TokenAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    /// Token TTL in seconds (default: 1 hour)
    pub token_ttl: i64,
}

impl TokenAuth {
    pub fn new(secret: &str) -> Result<Self, AuthError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::InvalidSecret(format!(
                "secret must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl: 3600,
        })
    }

    /// Create from environment variables
    ///
    /// Environment:
    /// - LIVE_FEED_JWT_SECRET: Secret key for signing (required, min 32 chars)
    /// - LIVE_FEED_TOKEN_TTL: Token TTL in seconds (optional, default 3600)
    pub fn from_env() -> Result<Self, AuthError> {
        let secret = std::env::var("LIVE_FEED_JWT_SECRET")
            .map_err(|_| AuthError::InvalidSecret("LIVE_FEED_JWT_SECRET is not set".to_string()))?;
        let mut auth = Self::new(&secret)?;

        if let Ok(ttl) = std::env::var("LIVE_FEED_TOKEN_TTL") {
            match ttl.parse::<i64>() {
                Ok(seconds) if seconds > 0 => auth.token_ttl = seconds,
                _ => tracing::warn!(value = %ttl, "ignoring invalid LIVE_FEED_TOKEN_TTL"),
            }
        }

        Ok(auth)
    }

    /// Issue a session token for `user_id`
    pub fn issue(&self, user_id: &str) -> Result<String, AuthError> {
        let claims = Claims::new(user_id, self.token_ttl);
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Token(e.to_string()))
    }

    /// Validate a token and return its claims
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::Token(e.to_string()),
            })?;

        if data.claims.is_expired() {
            return Err(AuthError::TokenExpired);
        }

        Ok(data.claims)
    }

    /// Validate an Authorization header value.
    /// Supports: "Bearer <token>" or just "<token>"
    pub fn verify_authorization(&self, header: &str) -> Result<Claims, AuthError> {
        let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        self.verify(token)
    }
}

/// Thread-safe wrapper for TokenAuth
pub type SharedTokenAuth = Arc<TokenAuth>;
