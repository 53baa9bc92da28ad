//! Session data owned by the authentication layer

use serde::{Deserialize, Serialize};

/// The signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// User id; also the JWT subject and the notification target
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
        }
    }
}

/// Authentication state observed by the live feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: Option<String>,
    pub current_user: Option<Identity>,
}

impl Session {
    pub fn signed_in(token: impl Into<String>, user: Identity) -> Self {
        Self {
            token: Some(token.into()),
            current_user: Some(user),
        }
    }

    /// Token a connection may be bound to; an empty string counts as absent
    pub fn bound_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}
