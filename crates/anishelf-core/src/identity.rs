//! Identity management
//!
//! The `IdentityStore` is the single source of truth for "who is signed in".
//! It is constructed once at startup, initialized from the auth provider, and
//! handed to whatever needs to observe the current user.
//!
//! State is published on a `tokio::sync::watch` channel as an
//! [`IdentitySnapshot`]. Every change of user (sign-in, sign-out, switching
//! accounts) bumps the snapshot's `version`; token refreshes for the same
//! user replace the session without bumping it. Consumers use the version to
//! discard work issued for an identity that is no longer current.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::AuthError;
use crate::session::{AuthEvent, Session, User, UserProfile};

/// OAuth providers offered for sign-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OAuthProvider {
    #[default]
    Google,
    Github,
    Discord,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Github => "github",
            OAuthProvider::Discord => "discord",
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OAuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(OAuthProvider::Google),
            "github" => Ok(OAuthProvider::Github),
            "discord" => Ok(OAuthProvider::Discord),
            other => Err(format!(
                "Unknown OAuth provider '{}'. Use google, github or discord.",
                other
            )),
        }
    }
}

/// The external auth provider
///
/// Sign-in is redirect based: `sign_in_with_oauth` only starts the flow. The
/// resulting session is delivered later as an [`AuthEvent`] on the channel
/// returned by `subscribe`.
pub trait AuthProvider: Send + Sync {
    /// Fetch the session persisted from an earlier run, if any
    fn get_session(&self) -> impl Future<Output = Result<Option<Session>, AuthError>> + Send;

    /// Start the OAuth redirect flow; returns the authorize URL
    fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
    ) -> impl Future<Output = Result<String, AuthError>> + Send;

    /// End the session with the provider
    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send;

    /// Subscribe to provider-pushed auth state changes
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Point-in-time view of the signed-in identity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentitySnapshot {
    /// Bumped every time the signed-in user changes
    pub version: u64,
    pub session: Option<Session>,
}

impl IdentitySnapshot {
    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user().map(|u| u.id.as_str())
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_some()
    }
}

/// Process-wide identity state
pub struct IdentityStore<A> {
    provider: Arc<A>,
    state: Arc<watch::Sender<IdentitySnapshot>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl<A: AuthProvider + 'static> IdentityStore<A> {
    /// Create a store in the signed-out state
    ///
    /// Call [`initialize`](Self::initialize) before handing it out.
    pub fn new(provider: Arc<A>) -> Self {
        let (state, _) = watch::channel(IdentitySnapshot::default());
        Self {
            provider,
            state: Arc::new(state),
            listener: Mutex::new(None),
        }
    }

    /// Load any existing session and start following provider events
    ///
    /// The event subscription is taken before the session is fetched so that
    /// an event delivered in between is applied after (and wins over) the
    /// fetched session. Calling this twice restarts the listener.
    pub async fn initialize(&self) {
        let mut events = self.provider.subscribe();

        match self.provider.get_session().await {
            Ok(Some(session)) => {
                info!("Restored session for user {}", session.user.id);
                apply_session(&self.state, Some(session));
            }
            Ok(None) => debug!("No existing session"),
            Err(e) => warn!("Failed to restore session: {}", e),
        }

        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        debug!("Auth event {:?}", event.kind);
                        apply_session(&state, event.session);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Auth listener lagged, skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Auth event channel closed");
                        break;
                    }
                }
            }
        });

        let mut listener = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = listener.replace(handle) {
            previous.abort();
        }
    }

    /// Apply an auth event: the event's session replaces the current one
    pub fn apply_event(&self, event: AuthEvent) {
        apply_session(&self.state, event.session);
    }

    /// Start an OAuth sign-in
    ///
    /// Success means the redirect was issued, not that the user is signed
    /// in; the session arrives later through the provider's events.
    pub async fn login_with_oauth(&self, provider: OAuthProvider) -> Result<String, AuthError> {
        match self.provider.sign_in_with_oauth(provider).await {
            Ok(url) => {
                info!("Started {} sign-in", provider);
                Ok(url)
            }
            Err(e) => {
                error!("{} login error: {}", provider, e);
                Err(e)
            }
        }
    }

    /// Sign out
    ///
    /// Best effort: a failed provider call is logged and local state is
    /// cleared anyway.
    pub async fn logout(&self) {
        if let Err(e) = self.provider.sign_out().await {
            warn!("Logout error: {}", e);
        }
        apply_session(&self.state, None);
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.borrow().is_logged_in()
    }

    pub fn session(&self) -> Option<Session> {
        self.state.borrow().session.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    /// Derived profile of the signed-in user, `None` when signed out
    pub fn profile(&self) -> Option<UserProfile> {
        self.state.borrow().user().map(User::profile)
    }

    pub fn snapshot(&self) -> IdentitySnapshot {
        self.state.borrow().clone()
    }

    /// Receive every identity change
    pub fn subscribe(&self) -> watch::Receiver<IdentitySnapshot> {
        self.state.subscribe()
    }

    pub fn provider(&self) -> &Arc<A> {
        &self.provider
    }
}

impl<A> Drop for IdentityStore<A> {
    fn drop(&mut self) {
        let listener = self.listener.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = listener.take() {
            handle.abort();
        }
    }
}

/// Overwrite the published session, bumping the version if the user changed
fn apply_session(state: &watch::Sender<IdentitySnapshot>, session: Option<Session>) {
    state.send_modify(|snapshot| {
        let old_user = snapshot.user_id().map(str::to_string);
        let new_user = session.as_ref().map(|s| s.user.id.as_str());
        if old_user.as_deref() != new_user {
            snapshot.version += 1;
        }
        snapshot.session = session;
    });
}
