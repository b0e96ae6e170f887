//! Backend-as-a-service collaborators
//!
//! HTTP implementations of [`AuthProvider`](crate::identity::AuthProvider)
//! and [`BookmarkTable`](crate::bookmarks::BookmarkTable) against a
//! Supabase-style project: GoTrue under `/auth/v1` and PostgREST under
//! `/rest/v1`.
//!
//! ## Usage
//!
//! ```ignore
//! let backend = SupabaseClient::from_config(&config)?;
//! let auth = SupabaseAuth::new(backend.clone(), &config);
//! let table = SupabaseBookmarks::new(backend);
//! ```

mod auth;
mod table;

pub use auth::{parse_callback, CallbackTokens, SupabaseAuth};
pub use table::SupabaseBookmarks;

use reqwest::{Method, RequestBuilder, Response, Url};

use crate::config::Config;
use crate::error::{AuthError, RemoteError};

/// Shared HTTP plumbing: project URL, anon key and a pooled client
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: Url,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(base_url: &str, anon_key: impl Into<String>) -> Result<Self, RemoteError> {
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: Url::parse(base_url)?,
            anon_key: anon_key.into(),
        })
    }

    /// Build from configuration; fails if the backend isn't configured
    pub fn from_config(config: &Config) -> Result<Self, AuthError> {
        let url = config
            .supabase_url
            .as_deref()
            .ok_or(AuthError::NotConfigured("supabase_url is not set"))?;
        let key = config
            .supabase_anon_key
            .as_deref()
            .ok_or(AuthError::NotConfigured("supabase_anon_key is not set"))?;
        Ok(Self::new(url, key)?)
    }

    /// Resolve a path (e.g. `auth/v1/user`) against the project URL
    pub(crate) fn url(&self, path: &str) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::Decode(format!("'{}' cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(path.split('/'));
        Ok(url)
    }

    /// Start a request carrying the project key and, if given, a user token
    pub(crate) fn request(
        &self,
        method: Method,
        url: Url,
        access_token: Option<&str>,
    ) -> RequestBuilder {
        let bearer = access_token.unwrap_or(self.anon_key.as_str());
        self.http
            .request(method, url)
            .header("apikey", self.anon_key.as_str())
            .bearer_auth(bearer)
    }
}

/// Turn a non-success response into a classified error
pub(crate) async fn check(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::from_response(status.as_u16(), &body))
}
