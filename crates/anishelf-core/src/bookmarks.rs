//! Bookmark store
//!
//! Keeps a local mirror of the signed-in user's bookmarks, backed by a remote
//! table. Mutations are gated on a signed-in user: called while signed out
//! they open the shared sign-in prompt and perform no remote call.
//!
//! ## Identity changes
//!
//! The store follows the identity watch channel. A change of user triggers
//! one full reload; signing out clears the mirror at once without touching
//! the remote table. Each load remembers the identity version it was issued
//! for, and a result that arrives after the version moved on is dropped.
//!
//! ## Concurrency
//!
//! Remote calls are not coordinated with each other. `toggle` checks
//! membership and then acts, so a concurrent change elsewhere can make it act
//! on stale information; a unique index on the remote table turns the
//! resulting double insert into a duplicate error.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::{BookmarkError, RemoteError};
use crate::identity::IdentitySnapshot;
use crate::models::{Anime, AnimeId, Bookmark, NewBookmark};
use crate::session::Session;

/// The remote bookmark table
///
/// Every call is scoped to the user owning `session`.
pub trait BookmarkTable: Send + Sync {
    /// All of the user's rows, newest `created_at` first
    fn select_by_user(
        &self,
        session: &Session,
    ) -> impl Future<Output = Result<Vec<Bookmark>, RemoteError>> + Send;

    /// Insert one row and return it as stored
    fn insert(
        &self,
        session: &Session,
        row: &NewBookmark,
    ) -> impl Future<Output = Result<Bookmark, RemoteError>> + Send;

    fn delete_by_user_and_anime(
        &self,
        session: &Session,
        anime_id: &AnimeId,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    fn delete_by_user(
        &self,
        session: &Session,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;
}

/// Shared "show sign-in prompt" flag
#[derive(Debug)]
pub struct AuthPrompt {
    open: watch::Sender<bool>,
}

impl AuthPrompt {
    pub fn new() -> Self {
        let (open, _) = watch::channel(false);
        Self { open }
    }

    pub fn open(&self) {
        self.open.send_replace(true);
    }

    pub fn close(&self) {
        self.open.send_replace(false);
    }

    pub fn is_open(&self) -> bool {
        *self.open.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.open.subscribe()
    }
}

impl Default for AuthPrompt {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a successful toggle
#[derive(Debug, Clone, PartialEq)]
pub enum Toggled {
    Added(Bookmark),
    Removed(AnimeId),
}

/// What the store did in response to an identity change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityChange {
    /// Same user as before (e.g. a token refresh)
    Unchanged,
    /// Signed out; mirror cleared
    Cleared,
    /// A user is now signed in; a reload is needed
    Reload,
}

#[derive(Debug, Default)]
struct Mirror {
    bookmarks: Vec<Bookmark>,
    /// Identity version last handled by `on_identity_change`
    seen_version: Option<u64>,
    loads_in_flight: usize,
}

/// Local mirror of the user's remote bookmarks
pub struct BookmarkStore<T> {
    table: T,
    identity: watch::Receiver<IdentitySnapshot>,
    prompt: Arc<AuthPrompt>,
    mirror: Mutex<Mirror>,
}

impl<T: BookmarkTable> BookmarkStore<T> {
    pub fn new(
        table: T,
        identity: watch::Receiver<IdentitySnapshot>,
        prompt: Arc<AuthPrompt>,
    ) -> Self {
        Self {
            table,
            identity,
            prompt,
            mirror: Mutex::new(Mirror::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Mirror> {
        self.mirror.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> IdentitySnapshot {
        self.identity.borrow().clone()
    }

    fn is_current(&self, version: u64) -> bool {
        self.identity.borrow().version == version
    }

    /// Session to use for a mutation, opening the sign-in prompt if there is none
    fn require_session(&self) -> Result<(u64, Session), BookmarkError> {
        let snapshot = self.snapshot();
        match snapshot.session {
            Some(session) => Ok((snapshot.version, session)),
            None => {
                self.prompt.open();
                Err(BookmarkError::AuthRequired)
            }
        }
    }

    // ==================== Queries ====================

    /// Current mirror, newest first
    pub fn bookmarks(&self) -> Vec<Bookmark> {
        self.lock().bookmarks.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().bookmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().bookmarks.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loads_in_flight > 0
    }

    pub fn is_bookmarked(&self, anime_id: &AnimeId) -> bool {
        self.lock().bookmarks.iter().any(|b| &b.anime_id == anime_id)
    }

    pub fn prompt(&self) -> &Arc<AuthPrompt> {
        &self.prompt
    }

    // ==================== Loading ====================

    /// Replace the mirror with the user's remote bookmarks
    ///
    /// Signed out: the mirror is emptied. On a fetch error the mirror is
    /// emptied as well rather than left stale.
    pub async fn load(&self) {
        let snapshot = self.snapshot();
        let Some(session) = snapshot.session else {
            self.lock().bookmarks.clear();
            return;
        };

        self.lock().loads_in_flight += 1;
        let result = self.table.select_by_user(&session).await;

        let mut mirror = self.lock();
        mirror.loads_in_flight -= 1;

        if !self.is_current(snapshot.version) {
            debug!(
                "Discarding bookmark load for identity version {}",
                snapshot.version
            );
            return;
        }

        match result {
            Ok(mut rows) => {
                rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                debug!("Loaded {} bookmarks", rows.len());
                mirror.bookmarks = rows;
            }
            Err(e) => {
                error!("Error loading bookmarks: {}", e);
                mirror.bookmarks.clear();
            }
        }
    }

    pub async fn reload(&self) {
        self.load().await
    }

    // ==================== Mutations ====================

    /// Bookmark an item
    ///
    /// The server's copy of the row is prepended to the mirror.
    pub async fn add(&self, anime: &Anime) -> Result<Bookmark, BookmarkError> {
        let (version, session) = self.require_session()?;

        if self.is_bookmarked(&anime.anime_id) {
            return Err(BookmarkError::Duplicate(anime.anime_id.clone()));
        }

        let row = NewBookmark::from_anime(&session.user.id, anime);
        let saved = match self.table.insert(&session, &row).await {
            Ok(saved) => saved,
            Err(e) => {
                error!("Error adding bookmark {}: {}", anime.anime_id, e);
                return Err(BookmarkError::from_remote(e, &anime.anime_id));
            }
        };

        if self.is_current(version) {
            let mut mirror = self.lock();
            mirror.bookmarks.retain(|b| b.anime_id != saved.anime_id);
            mirror.bookmarks.insert(0, saved.clone());
        }
        info!("Bookmarked {}", saved.anime_id);
        Ok(saved)
    }

    /// Remove a bookmark by item id
    pub async fn remove(&self, anime_id: &AnimeId) -> Result<(), BookmarkError> {
        let (version, session) = self.require_session()?;

        if let Err(e) = self
            .table
            .delete_by_user_and_anime(&session, anime_id)
            .await
        {
            error!("Error removing bookmark {}: {}", anime_id, e);
            return Err(BookmarkError::Remote(e));
        }

        if self.is_current(version) {
            self.lock().bookmarks.retain(|b| &b.anime_id != anime_id);
        }
        info!("Removed bookmark {}", anime_id);
        Ok(())
    }

    /// Add the item if it isn't bookmarked, remove it if it is
    pub async fn toggle(&self, anime: &Anime) -> Result<Toggled, BookmarkError> {
        if self.is_bookmarked(&anime.anime_id) {
            self.remove(&anime.anime_id).await?;
            Ok(Toggled::Removed(anime.anime_id.clone()))
        } else {
            self.add(anime).await.map(Toggled::Added)
        }
    }

    /// Delete every bookmark of the user; does nothing when signed out
    pub async fn clear_all(&self) -> Result<(), BookmarkError> {
        let snapshot = self.snapshot();
        let Some(session) = snapshot.session else {
            return Ok(());
        };

        if let Err(e) = self.table.delete_by_user(&session).await {
            error!("Error clearing bookmarks: {}", e);
            return Err(BookmarkError::Remote(e));
        }

        if self.is_current(snapshot.version) {
            self.lock().bookmarks.clear();
        }
        info!("Cleared all bookmarks");
        Ok(())
    }

    // ==================== Identity tracking ====================

    /// React to the current identity snapshot
    ///
    /// Signing out clears the mirror before this returns. A new user only
    /// yields [`IdentityChange::Reload`]; the caller runs the load.
    pub fn on_identity_change(&self) -> IdentityChange {
        let (version, logged_in) = {
            let snapshot = self.identity.borrow();
            (snapshot.version, snapshot.is_logged_in())
        };

        let mut mirror = self.lock();
        if mirror.seen_version == Some(version) {
            return IdentityChange::Unchanged;
        }
        mirror.seen_version = Some(version);

        if logged_in {
            IdentityChange::Reload
        } else {
            mirror.bookmarks.clear();
            IdentityChange::Cleared
        }
    }

    /// Handle the current identity, running the reload inline if needed
    pub async fn sync_identity(&self) -> IdentityChange {
        let change = self.on_identity_change();
        if change == IdentityChange::Reload {
            self.load().await;
        }
        change
    }
}

impl<T: BookmarkTable + 'static> BookmarkStore<T> {
    /// Follow identity changes for as long as the identity store lives
    ///
    /// Handles the current identity immediately, then every change. Loads run
    /// as separate tasks so a sign-out is applied without waiting for an
    /// in-flight load.
    pub fn watch_identity(self: &Arc<Self>) -> JoinHandle<()> {
        let store = Arc::clone(self);
        let mut changes = self.identity.clone();

        tokio::spawn(async move {
            loop {
                if store.on_identity_change() == IdentityChange::Reload {
                    let loader = Arc::clone(&store);
                    tokio::spawn(async move { loader.load().await });
                }
                if changes.changed().await.is_err() {
                    debug!("Identity channel closed, stopping bookmark tracking");
                    break;
                }
            }
        })
    }
}
