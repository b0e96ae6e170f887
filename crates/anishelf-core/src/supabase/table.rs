//! PostgREST-backed bookmark table

use reqwest::{Method, Url};
use serde_json::Value;
use tracing::debug;

use super::{check, SupabaseClient};
use crate::api::decode_items;
use crate::bookmarks::BookmarkTable;
use crate::error::RemoteError;
use crate::models::{AnimeId, Bookmark, NewBookmark};
use crate::session::Session;

const TABLE_PATH: &str = "rest/v1/bookmarks";

/// The `bookmarks` table, accessed with the signed-in user's token
#[derive(Debug, Clone)]
pub struct SupabaseBookmarks {
    client: SupabaseClient,
}

impl SupabaseBookmarks {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Table URL with PostgREST `column=eq.value` filters
    fn filtered(&self, filters: &[(&str, &str)]) -> Result<Url, RemoteError> {
        let mut url = self.client.url(TABLE_PATH)?;
        {
            let mut query = url.query_pairs_mut();
            for (column, value) in filters {
                query.append_pair(column, &format!("eq.{}", value));
            }
        }
        Ok(url)
    }

    async fn delete(&self, session: &Session, url: Url) -> Result<(), RemoteError> {
        let response = self
            .client
            .request(Method::DELETE, url, Some(&session.access_token))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

impl BookmarkTable for SupabaseBookmarks {
    async fn select_by_user(&self, session: &Session) -> Result<Vec<Bookmark>, RemoteError> {
        let mut url = self.filtered(&[("user_id", &session.user.id)])?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("order", "created_at.desc");

        let response = self
            .client
            .request(Method::GET, url, Some(&session.access_token))
            .send()
            .await?;
        let rows = check(response).await?.json::<Vec<Value>>().await?;
        let bookmarks: Vec<Bookmark> = decode_items("bookmark", rows);
        debug!("Fetched {} bookmark rows", bookmarks.len());
        Ok(bookmarks)
    }

    async fn insert(&self, session: &Session, row: &NewBookmark) -> Result<Bookmark, RemoteError> {
        let url = self.client.url(TABLE_PATH)?;
        let response = self
            .client
            .request(Method::POST, url, Some(&session.access_token))
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await?;

        check(response)
            .await?
            .json::<Vec<Bookmark>>()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RemoteError::Decode("insert returned no rows".to_string()))
    }

    async fn delete_by_user_and_anime(
        &self,
        session: &Session,
        anime_id: &AnimeId,
    ) -> Result<(), RemoteError> {
        let url = self.filtered(&[
            ("user_id", &session.user.id),
            ("anime_id", anime_id.as_str()),
        ])?;
        self.delete(session, url).await
    }

    async fn delete_by_user(&self, session: &Session) -> Result<(), RemoteError> {
        let url = self.filtered(&[("user_id", &session.user.id)])?;
        self.delete(session, url).await
    }
}
