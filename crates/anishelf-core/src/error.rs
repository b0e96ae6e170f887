//! Error types
//!
//! Remote failures are classified once, at the HTTP boundary, so the stores
//! can turn them into the auth-required / duplicate / failure outcomes
//! callers act on.

use std::io;
use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

use crate::models::AnimeId;

/// PostgreSQL unique_violation, surfaced by PostgREST as the error `code`
const UNIQUE_VIOLATION: &str = "23505";

/// Errors from a remote collaborator (auth provider, bookmark table, proxy API)
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Transport-level failure (DNS, connection refused, TLS, body read)
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// A row with the same unique key already exists
    #[error("Row already exists: {0}")]
    Conflict(String),

    /// The response body did not have the expected shape
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// A URL could not be built from the configured base
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl RemoteError {
    /// Classify a non-success response
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let message = error_message(parsed.as_ref(), body);
        let code = parsed
            .as_ref()
            .and_then(|value| value.get("code"))
            .and_then(Value::as_str);

        if status == 409 || code == Some(UNIQUE_VIOLATION) {
            RemoteError::Conflict(message)
        } else {
            RemoteError::Status { status, message }
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, RemoteError::Conflict(_))
    }
}

/// Pull a readable message out of a JSON error body, falling back to the raw text
fn error_message(parsed: Option<&Value>, body: &str) -> String {
    parsed
        .and_then(|value| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        })
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}

/// Errors from the auth provider
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Auth request failed: {0}")]
    Remote(#[from] RemoteError),

    /// The provider rejected the sign-in (reported in the redirect)
    #[error("Sign-in rejected: {0}")]
    Rejected(String),

    #[error("Invalid OAuth callback: {0}")]
    InvalidCallback(String),

    #[error("Auth is not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Failed to open browser: {0}")]
    Browser(#[source] io::Error),

    #[error("Failed to access session file '{path}': {source}")]
    SessionFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed session file: {0}")]
    MalformedSession(#[from] serde_json::Error),
}

/// Failure outcome of a bookmark operation
#[derive(Error, Debug)]
pub enum BookmarkError {
    /// Mutation attempted without a signed-in user; the sign-in prompt was opened
    #[error("Sign in to manage bookmarks")]
    AuthRequired,

    /// The item is already bookmarked
    #[error("Already in bookmarks: {0}")]
    Duplicate(AnimeId),

    #[error("{0}")]
    Remote(RemoteError),
}

impl BookmarkError {
    /// Whether the caller should surface a sign-in prompt
    pub fn needs_auth(&self) -> bool {
        matches!(self, BookmarkError::AuthRequired)
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, BookmarkError::Duplicate(_))
    }

    /// Map a remote error, treating unique-key conflicts as duplicates
    pub(crate) fn from_remote(error: RemoteError, anime_id: &AnimeId) -> Self {
        if error.is_conflict() {
            BookmarkError::Duplicate(anime_id.clone())
        } else {
            BookmarkError::Remote(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_status_classification() {
        let err = RemoteError::from_response(409, r#"{"message":"duplicate key"}"#);
        assert!(err.is_conflict());
        assert_eq!(err.to_string(), "Row already exists: duplicate key");
    }

    #[test]
    fn test_unique_violation_code_classification() {
        let body = r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#;
        let err = RemoteError::from_response(400, body);
        assert!(err.is_conflict());
    }

    #[test]
    fn test_unique_violation_only_from_code_field() {
        let body = r#"{"code":"P0001","message":"order 23505 not found"}"#;
        match RemoteError::from_response(400, body) {
            RemoteError::Status { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "order 23505 not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(!RemoteError::from_response(500, "upstream 23505").is_conflict());
    }

    #[test]
    fn test_status_classification_uses_message() {
        let err = RemoteError::from_response(401, r#"{"msg":"JWT expired"}"#);
        match err {
            RemoteError::Status { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "JWT expired");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_status_classification_plain_body() {
        let err = RemoteError::from_response(502, "Bad Gateway\n");
        assert_eq!(err.to_string(), "Server returned 502: Bad Gateway");
    }

    #[test]
    fn test_bookmark_error_flags() {
        assert!(BookmarkError::AuthRequired.needs_auth());
        assert!(!BookmarkError::AuthRequired.is_duplicate());

        let id = AnimeId::from("1");
        let dup = BookmarkError::from_remote(RemoteError::Conflict("x".into()), &id);
        assert!(dup.is_duplicate());
        assert!(!dup.needs_auth());

        let remote = BookmarkError::from_remote(RemoteError::Decode("bad".into()), &id);
        assert!(matches!(remote, BookmarkError::Remote(_)));
    }
}
