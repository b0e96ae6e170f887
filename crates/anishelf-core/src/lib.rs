//! anishelf Core Library
//!
//! This crate provides the core functionality for anishelf, a client for an
//! anime catalog with per-user bookmarks.
//!
//! # Architecture
//!
//! - **IdentityStore**: the signed-in user, published on a `watch` channel
//! - **BookmarkStore**: local mirror of the user's bookmarks, backed by a
//!   remote table and gated on a signed-in user
//! - **ApiClient**: catalog proxy endpoints that never fail, they fall back
//!   to empty values
//!
//! The remote auth provider and table sit behind traits; `supabase` has the
//! HTTP implementations.
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let backend = SupabaseClient::from_config(&config)?;
//!
//! let identity = IdentityStore::new(Arc::new(SupabaseAuth::new(backend.clone(), &config)));
//! identity.initialize().await;
//!
//! let bookmarks = BookmarkStore::new(
//!     SupabaseBookmarks::new(backend),
//!     identity.subscribe(),
//!     Arc::new(AuthPrompt::default()),
//! );
//! bookmarks.sync_identity().await;
//! bookmarks.toggle(&anime).await?;
//! ```
//!
//! # Modules
//!
//! - `identity`: Signed-in user state and the auth provider seam
//! - `bookmarks`: Bookmark store and the remote table seam
//! - `api`: Catalog proxy client
//! - `supabase`: HTTP auth provider and bookmark table
//! - `models`: Anime, bookmark and catalog records
//! - `session`: Sessions, users and auth events
//! - `routes`: Client-side routes and navigation history
//! - `config`: Application configuration

pub mod api;
pub mod bookmarks;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod routes;
pub mod session;
pub mod supabase;

#[cfg(test)]
mod test_support;

pub use api::ApiClient;
pub use bookmarks::{AuthPrompt, BookmarkStore, BookmarkTable, Toggled};
pub use config::Config;
pub use error::{AuthError, BookmarkError, RemoteError};
pub use identity::{AuthProvider, IdentitySnapshot, IdentityStore, OAuthProvider};
pub use models::{Anime, AnimeId, Bookmark, Feed, Genre, NewBookmark, Video};
pub use routes::{History, Route};
pub use session::{AuthEvent, AuthEventKind, Session, User, UserProfile};
pub use supabase::{SupabaseAuth, SupabaseBookmarks, SupabaseClient};
