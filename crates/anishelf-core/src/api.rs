//! Catalog API client
//!
//! Stateless wrappers over the anime proxy's REST endpoints. Every endpoint
//! answers with a `{ "response": ... }` envelope; a missing `response` is
//! treated as the empty payload.
//!
//! Failures never reach the caller: network errors, non-success statuses and
//! undecodable bodies are logged and replaced by the endpoint's empty value
//! (empty list, `None`, or an empty feed).

use std::time::Duration;

use rand::Rng;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::RemoteError;
use crate::models::{Anime, Feed, Genre, Video};

/// Default proxy base URL
pub const DEFAULT_API_BASE: &str = "https://yummy-proxy.vercel.app/api";

/// Upper bound (exclusive) of the offset used to pick a random item
const RANDOM_OFFSET_LIMIT: u32 = 10_000;

/// Query parameters passed through to list endpoints
pub type Filters = [(String, String)];

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: Option<T>,
}

/// Client for the anime proxy API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Build a client from configuration (base URL and optional timeout)
    pub fn from_config(config: &Config) -> Result<Self, RemoteError> {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            "anishelf/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self::with_http(builder.build()?, config.api_base_url.clone()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build `base/segments...?query`, percent-encoding each segment
    fn endpoint(&self, segments: &[&str], query: &Filters) -> Result<Url, RemoteError> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::Decode(format!("'{}' cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    /// GET an endpoint and unwrap its envelope
    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &Filters,
    ) -> Result<Option<T>, RemoteError> {
        let url = self.endpoint(segments, query)?;
        debug!("GET {}", url);

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::from_response(status.as_u16(), &body));
        }

        let bytes = response.bytes().await?;
        let envelope: Envelope<T> =
            serde_json::from_slice(&bytes).map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(envelope.response)
    }

    /// GET with the uniform fallback policy
    async fn get_or_default<T: DeserializeOwned + Default>(
        &self,
        what: &str,
        segments: &[&str],
        query: &Filters,
    ) -> T {
        match self.get::<T>(segments, query).await {
            Ok(payload) => payload.unwrap_or_default(),
            Err(e) => {
                warn!("Failed to fetch {}: {}", what, e);
                T::default()
            }
        }
    }

    /// GET a list endpoint, decoding items one by one
    ///
    /// An item that doesn't decode is logged and skipped; the rest are kept.
    async fn get_list<T: DeserializeOwned>(
        &self,
        what: &str,
        segments: &[&str],
        query: &Filters,
    ) -> Vec<T> {
        let items: Vec<Value> = self.get_or_default(what, segments, query).await;
        decode_items(what, items)
    }

    /// List anime, passing `filters` through as query parameters
    pub async fn get_anime(&self, filters: &Filters) -> Vec<Anime> {
        self.get_list("anime", &["anime"], filters).await
    }

    /// A random catalog item (random offset into the full list)
    pub async fn get_random_anime(&self) -> Option<Anime> {
        let offset = rand::rng().random_range(0..RANDOM_OFFSET_LIMIT);
        let query = [
            ("limit".to_string(), "1".to_string()),
            ("offset".to_string(), offset.to_string()),
        ];
        let items: Vec<Anime> = self
            .get_list("random anime", &["anime"], &query)
            .await;
        items.into_iter().next()
    }

    /// Details by numeric id or URL slug
    pub async fn get_anime_details(&self, id_or_url: &str) -> Option<Anime> {
        match self.get::<Anime>(&["anime", id_or_url], &[]).await {
            Ok(anime) => anime,
            Err(e) => {
                warn!("Failed to fetch anime details for '{}': {}", id_or_url, e);
                None
            }
        }
    }

    /// Free-text search
    pub async fn search_anime(&self, query: &str) -> Vec<Anime> {
        let query = [("q".to_string(), query.to_string())];
        self.get_list("search results", &["search"], &query)
            .await
    }

    /// Homepage content bundle
    pub async fn get_feed(&self) -> Feed {
        self.get_or_default("feed", &["feed"], &[]).await
    }

    /// Schedule of ongoing series
    pub async fn get_schedule(&self) -> Vec<Anime> {
        self.get_list("schedule", &["anime", "schedule"], &[])
            .await
    }

    pub async fn get_genres(&self) -> Vec<Genre> {
        self.get_list("genres", &["anime", "genres"], &[])
            .await
    }

    pub async fn get_anime_by_genre(&self, genre_id: &str, filters: &Filters) -> Vec<Anime> {
        self.get_list("anime by genre", &["anime", "genres", genre_id], filters)
            .await
    }

    /// Episode videos of an anime
    pub async fn get_anime_videos(&self, anime_id: &str) -> Vec<Video> {
        self.get_list("videos", &["anime", anime_id, "videos"], &[])
            .await
    }
}

/// Decode each element on its own, dropping the ones that don't fit `T`
pub(crate) fn decode_items<T: DeserializeOwned>(what: &str, items: Vec<Value>) -> Vec<T> {
    let total = items.len();
    let decoded: Vec<T> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("Skipping malformed {} item: {}", what, e);
                None
            }
        })
        .collect();
    if decoded.len() < total {
        debug!("Kept {} of {} {} items", decoded.len(), total, what);
    }
    decoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestServer;

    fn api_client(server: &TestServer) -> ApiClient {
        ApiClient::new(format!("{}/api", server.base_url))
    }

    /// A base URL nothing listens on
    fn unreachable_client() -> ApiClient {
        ApiClient::new("http://127.0.0.1:9/api")
    }

    #[test]
    fn test_endpoint_building() {
        let client = ApiClient::new("https://proxy.example/api/");

        let url = client.endpoint(&["anime", "genres", "5"], &[]).unwrap();
        assert_eq!(url.as_str(), "https://proxy.example/api/anime/genres/5");

        let filters = vec![
            ("limit".to_string(), "20".to_string()),
            ("sort".to_string(), "top".to_string()),
        ];
        let url = client.endpoint(&["anime"], &filters).unwrap();
        assert_eq!(url.as_str(), "https://proxy.example/api/anime?limit=20&sort=top");
    }

    #[test]
    fn test_endpoint_encodes_segments_and_query() {
        let client = ApiClient::new("https://proxy.example/api");

        let url = client.endpoint(&["anime", "a/b c"], &[]).unwrap();
        assert_eq!(url.as_str(), "https://proxy.example/api/anime/a%2Fb%20c");

        let query = [("q".to_string(), "ghost in the shell".to_string())];
        let url = client.endpoint(&["search"], &query).unwrap();
        assert_eq!(url.as_str(), "https://proxy.example/api/search?q=ghost+in+the+shell");
    }

    #[test]
    fn test_envelope_missing_response_is_empty() {
        let envelope: Envelope<Vec<Anime>> = serde_json::from_str("{}").unwrap();
        assert!(envelope.response.is_none());

        let envelope: Envelope<Vec<Anime>> = serde_json::from_str(r#"{"response": null}"#).unwrap();
        assert!(envelope.response.is_none());
    }

    #[tokio::test]
    async fn test_network_failure_falls_back_to_defaults() {
        let client = unreachable_client();

        assert!(client.get_anime(&[]).await.is_empty());
        assert!(client.get_random_anime().await.is_none());
        assert!(client.get_anime_details("1").await.is_none());
        assert!(client.search_anime("naruto").await.is_empty());
        assert!(client.get_feed().await.is_empty());
        assert!(client.get_schedule().await.is_empty());
        assert!(client.get_genres().await.is_empty());
        assert!(client.get_anime_by_genre("1", &[]).await.is_empty());
        assert!(client.get_anime_videos("1").await.is_empty());
    }

    #[tokio::test]
    async fn test_error_status_falls_back() {
        let server = TestServer::start(500, r#"{"error":"upstream down"}"#).await;
        let client = api_client(&server);

        assert!(client.get_anime(&[]).await.is_empty());
        assert!(client.get_feed().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_response_field_is_empty() {
        let server = TestServer::start(200, r#"{"status":"ok"}"#).await;
        let client = api_client(&server);

        assert!(client.get_genres().await.is_empty());
        assert!(client.get_anime_details("fma").await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_json_falls_back() {
        let server = TestServer::start(200, "<html>not json</html>").await;
        assert!(api_client(&server).search_anime("x").await.is_empty());
    }

    #[tokio::test]
    async fn test_search_unwraps_envelope() {
        let body = r#"{"response":[{"anime_id":1,"title":"Cowboy Bebop","anime_url":"cowboy-bebop"},{"anime_id":"2","title":"Trigun"}]}"#;
        let server = TestServer::start(200, body).await;

        let results = api_client(&server).search_anime("space cowboy").await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Cowboy Bebop");
        assert_eq!(results[1].anime_id.as_str(), "2");
        assert_eq!(
            server.request_lines(),
            vec!["GET /api/search?q=space+cowboy HTTP/1.1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_null_fields_do_not_drop_other_results() {
        let body = r#"{"response":[{"anime_id":1,"title":"Bebop"},{"anime_id":2,"title":null,"year":"2004"}]}"#;
        let server = TestServer::start(200, body).await;

        let results = api_client(&server).search_anime("bebop").await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[1].title, "");
        assert_eq!(results[1].year, Some(2004));
    }

    #[tokio::test]
    async fn test_malformed_item_is_skipped() {
        let body = r#"{"response":[{"video_id":1,"number":1},{"video_id":[1,2]},{"video_id":3,"number":null}]}"#;
        let server = TestServer::start(200, body).await;

        let videos = api_client(&server).get_anime_videos("42").await;

        let ids: Vec<&str> = videos.iter().map(|v| v.video_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_decode_items_keeps_valid_entries() {
        let items = vec![
            serde_json::json!({"id": 1, "title": "Action"}),
            serde_json::json!("not a genre"),
            serde_json::json!({"id": "2", "title": null}),
        ];
        let genres: Vec<Genre> = decode_items("genres", items);

        assert_eq!(genres.len(), 2);
        assert_eq!(genres[1].id, "2");
    }

    #[tokio::test]
    async fn test_random_anime_requests_single_item() {
        let body = r#"{"response":[{"anime_id":77,"title":"Haibane Renmei"}]}"#;
        let server = TestServer::start(200, body).await;

        let anime = api_client(&server).get_random_anime().await.unwrap();

        assert_eq!(anime.anime_id.as_str(), "77");
        let line = &server.request_lines()[0];
        assert!(line.starts_with("GET /api/anime?limit=1&offset="), "{}", line);
    }

    #[tokio::test]
    async fn test_details_and_videos_paths() {
        let body = r#"{"response":{"anime_id":5,"title":"Monster"}}"#;
        let server = TestServer::start(200, body).await;
        let client = api_client(&server);

        let anime = client.get_anime_details("monster").await.unwrap();
        assert_eq!(anime.title, "Monster");

        // Object payload where a list is expected decodes as failure -> empty
        assert!(client.get_anime_videos("5").await.is_empty());

        assert_eq!(
            server.request_lines(),
            vec![
                "GET /api/anime/monster HTTP/1.1".to_string(),
                "GET /api/anime/5/videos HTTP/1.1".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_genre_listing_with_filters() {
        let body = r#"{"response":[{"anime_id":3,"title":"Mononoke"}]}"#;
        let server = TestServer::start(200, body).await;

        let filters = vec![("limit".to_string(), "5".to_string())];
        let items = api_client(&server).get_anime_by_genre("12", &filters).await;

        assert_eq!(items.len(), 1);
        assert_eq!(
            server.request_lines(),
            vec!["GET /api/anime/genres/12?limit=5 HTTP/1.1".to_string()]
        );
    }
}
