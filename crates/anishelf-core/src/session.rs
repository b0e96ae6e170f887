//! Session and user types
//!
//! A `Session` is issued by the auth provider and replaced wholesale on every
//! auth event. `UserProfile` is a read-only projection recomputed from the
//! session's user whenever it changes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tokens are treated as expired slightly before their real expiry
const EXPIRY_MARGIN_SECS: i64 = 30;

/// The authenticated user as reported by the auth provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Free-form metadata from the OAuth provider (name, avatar, ...)
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
}

impl User {
    pub fn new(id: impl Into<String>, email: Option<&str>) -> Self {
        Self {
            id: id.into(),
            email: email.map(str::to_string),
            user_metadata: Map::new(),
        }
    }

    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.user_metadata
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Build the derived profile for display
    pub fn profile(&self) -> UserProfile {
        let email_local = self
            .email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty());

        let username = self
            .metadata_str("full_name")
            .or_else(|| self.metadata_str("name"))
            .or_else(|| self.metadata_str("given_name"))
            .or(email_local)
            .map(str::to_string);

        let avatar = self
            .metadata_str("avatar_url")
            .or_else(|| self.metadata_str("picture"))
            .map(str::to_string);

        UserProfile {
            id: self.id.clone(),
            email: self.email.clone(),
            username,
            avatar,
            given_name: self.metadata_str("given_name").map(str::to_string),
            family_name: self.metadata_str("family_name").map(str::to_string),
        }
    }
}

/// Authenticated credential issued by the auth provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub user: User,
}

impl Session {
    /// Whether the access token is expired (or about to be)
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let Some(expires_at) = self.expires_at else {
            return false;
        };
        match now.checked_add_signed(Duration::seconds(EXPIRY_MARGIN_SECS)) {
            Some(deadline) => expires_at <= deadline,
            None => true,
        }
    }
}

/// Display projection of the authenticated user
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub email: Option<String>,
    /// First non-empty of full name, name, given name, or email local-part
    pub username: Option<String>,
    pub avatar: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

/// Kind of auth state change pushed by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEventKind {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// An auth state change: the kind plus the session now in effect
#[derive(Debug, Clone, PartialEq)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<Session>,
}

impl AuthEvent {
    pub fn signed_in(session: Session) -> Self {
        Self {
            kind: AuthEventKind::SignedIn,
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            kind: AuthEventKind::SignedOut,
            session: None,
        }
    }

    pub fn token_refreshed(session: Session) -> Self {
        Self {
            kind: AuthEventKind::TokenRefreshed,
            session: Some(session),
        }
    }
}
