//! GoTrue-backed auth provider
//!
//! Sign-in uses the implicit OAuth flow: the browser is sent to
//! `/auth/v1/authorize`, the provider redirects back to `redirect_url` with
//! the tokens in the URL fragment, and [`SupabaseAuth::complete_oauth`]
//! turns that callback URL into a session.
//!
//! The session is persisted as JSON in the data directory so it survives
//! restarts. Every change is broadcast as an [`AuthEvent`].

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::{check, SupabaseClient};
use crate::config::Config;
use crate::error::{AuthError, RemoteError};
use crate::identity::{AuthProvider, OAuthProvider};
use crate::session::{AuthEvent, Session, User};

/// Capacity of the auth event channel
const EVENT_CAPACITY: usize = 16;

/// Token grant as returned by `/auth/v1/token`
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

/// Tokens carried by an OAuth redirect
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Parse the redirect the provider sent the browser to
///
/// Accepts the full callback URL or just its fragment
/// (`access_token=...&refresh_token=...`). Tokens are read from the fragment,
/// falling back to the query string.
pub fn parse_callback(callback: &str) -> Result<CallbackTokens, AuthError> {
    let callback = callback.trim();
    let params: HashMap<String, String> = match Url::parse(callback) {
        Ok(url) => {
            let raw = url
                .fragment()
                .filter(|f| !f.is_empty())
                .or_else(|| url.query())
                .unwrap_or_default();
            url::form_urlencoded::parse(raw.as_bytes())
                .into_owned()
                .collect()
        }
        Err(_) if callback.contains('=') => {
            url::form_urlencoded::parse(callback.trim_start_matches(['#', '?']).as_bytes())
                .into_owned()
                .collect()
        }
        Err(e) => return Err(AuthError::InvalidCallback(e.to_string())),
    };

    if let Some(reason) = params
        .get("error_description")
        .or_else(|| params.get("error"))
    {
        return Err(AuthError::Rejected(reason.clone()));
    }

    let access_token = params
        .get("access_token")
        .filter(|t| !t.is_empty())
        .cloned()
        .ok_or_else(|| AuthError::InvalidCallback("no access_token in callback".to_string()))?;

    let number = |key: &str| params.get(key).and_then(|v| v.parse::<i64>().ok());

    Ok(CallbackTokens {
        access_token,
        refresh_token: params.get("refresh_token").cloned(),
        expires_at: expiry(number("expires_at"), number("expires_in")),
    })
}

/// Absolute expiry from either a unix timestamp or a lifetime in seconds
fn expiry(expires_at: Option<i64>, expires_in: Option<i64>) -> Option<DateTime<Utc>> {
    expires_at
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .or_else(|| {
            expires_in
                .and_then(Duration::try_seconds)
                .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        })
}

/// Auth provider backed by the project's GoTrue endpoints
pub struct SupabaseAuth {
    client: SupabaseClient,
    redirect_to: String,
    session_path: PathBuf,
    events: broadcast::Sender<AuthEvent>,
    open_browser: bool,
}

impl SupabaseAuth {
    pub fn new(client: SupabaseClient, config: &Config) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            client,
            redirect_to: config.redirect_url.clone(),
            session_path: config.session_path(),
            events,
            open_browser: true,
        }
    }

    /// Don't launch a browser on sign-in; the caller shows the URL instead
    pub fn without_browser(mut self) -> Self {
        self.open_browser = false;
        self
    }

    /// The URL that starts the OAuth flow for `provider`
    pub fn authorize_url(&self, provider: OAuthProvider) -> Result<Url, RemoteError> {
        let mut url = self.client.url("auth/v1/authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", provider.as_str())
            .append_pair("redirect_to", &self.redirect_to);
        Ok(url)
    }

    /// Finish sign-in from the provider's redirect
    ///
    /// Fetches the user for the new token, persists the session and
    /// broadcasts `SignedIn`.
    pub async fn complete_oauth(&self, callback: &str) -> Result<Session, AuthError> {
        let tokens = parse_callback(callback)?;
        let user = self.fetch_user(&tokens.access_token).await?;

        let session = Session {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: tokens.expires_at,
            user,
        };
        self.save_session(&session)?;
        info!("Signed in as {}", session.user.id);
        self.emit(AuthEvent::signed_in(session.clone()));
        Ok(session)
    }

    async fn fetch_user(&self, access_token: &str) -> Result<User, AuthError> {
        let url = self.client.url("auth/v1/user")?;
        let response = self
            .client
            .request(Method::GET, url, Some(access_token))
            .send()
            .await
            .map_err(RemoteError::from)?;
        let user = check(response)
            .await?
            .json::<User>()
            .await
            .map_err(RemoteError::from)?;
        Ok(user)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let mut url = self.client.url("auth/v1/token")?;
        url.query_pairs_mut()
            .append_pair("grant_type", "refresh_token");

        let response = self
            .client
            .request(Method::POST, url, None)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(RemoteError::from)?;
        let grant = check(response)
            .await?
            .json::<TokenResponse>()
            .await
            .map_err(RemoteError::from)?;

        Ok(Session {
            access_token: grant.access_token,
            refresh_token: grant
                .refresh_token
                .or_else(|| Some(refresh_token.to_string())),
            expires_at: expiry(grant.expires_at, grant.expires_in),
            user: grant.user,
        })
    }

    // ==================== Session file ====================

    fn load_session(&self) -> Result<Option<Session>, AuthError> {
        match fs::read_to_string(&self.session_path) {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(AuthError::SessionFile {
                path: self.session_path.clone(),
                source,
            }),
        }
    }

    fn save_session(&self, session: &Session) -> Result<(), AuthError> {
        let file_error = |source| AuthError::SessionFile {
            path: self.session_path.clone(),
            source,
        };
        if let Some(parent) = self.session_path.parent() {
            fs::create_dir_all(parent).map_err(file_error)?;
        }
        let json = serde_json::to_string_pretty(session)?;
        fs::write(&self.session_path, json).map_err(file_error)
    }

    fn delete_session(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.session_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(AuthError::SessionFile {
                path: self.session_path.clone(),
                source,
            }),
        }
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

impl AuthProvider for SupabaseAuth {
    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        let Some(session) = self.load_session()? else {
            return Ok(None);
        };

        if !session.is_expired() {
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.as_deref() else {
            debug!("Stored session expired without a refresh token");
            self.delete_session()?;
            return Ok(None);
        };

        let refreshed = self.refresh(refresh_token).await?;
        self.save_session(&refreshed)?;
        debug!("Refreshed session for {}", refreshed.user.id);
        self.emit(AuthEvent::token_refreshed(refreshed.clone()));
        Ok(Some(refreshed))
    }

    async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> Result<String, AuthError> {
        let url = self.authorize_url(provider)?;
        if self.open_browser {
            open::that(url.as_str()).map_err(AuthError::Browser)?;
        }
        Ok(url.to_string())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let result = match self.load_session() {
            Ok(Some(session)) => self.revoke(&session.access_token).await,
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };

        if let Err(e) = self.delete_session() {
            warn!("Failed to remove session file: {}", e);
        }
        self.emit(AuthEvent::signed_out());
        result
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

impl SupabaseAuth {
    async fn revoke(&self, access_token: &str) -> Result<(), AuthError> {
        let url = self.client.url("auth/v1/logout")?;
        let response = self
            .client
            .request(Method::POST, url, Some(access_token))
            .send()
            .await
            .map_err(RemoteError::from)?;
        check(response).await?;
        Ok(())
    }
}
