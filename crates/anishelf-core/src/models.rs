//! Data models for anishelf
//!
//! Defines the catalog payloads returned by the proxy API (Anime, Genre,
//! Video, Feed) and the Bookmark rows stored in the remote table.
//!
//! Catalog payloads are lenient: known fields are typed, everything else the
//! upstream API sends is kept in an `extra` map so nothing is lost when a
//! payload is printed as JSON.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Identifier of a catalog item
///
/// The upstream API sends ids as numbers in some payloads and as strings in
/// others. An `AnimeId` always holds the trimmed string form, so `42` and
/// `"42"` compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimeId(String);

impl AnimeId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for AnimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AnimeId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for AnimeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AnimeId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<u64> for AnimeId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for AnimeId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<u32> for AnimeId {
    fn from(value: u32) -> Self {
        Self(value.to_string())
    }
}

impl Serialize for AnimeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AnimeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IdVisitor).map(AnimeId::new)
    }
}

/// Accepts a JSON string or number and yields its string form
struct IdVisitor;

impl Visitor<'_> for IdVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or numeric identifier")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
        // 42.0 must normalize the same way as 42
        if v.fract() == 0.0 && v.abs() < 1e15 {
            Ok(format!("{}", v as i64))
        } else {
            Ok(v.to_string())
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
        Ok(v)
    }
}

/// Deserialize a string-or-number field into a plain `String`; `null` is empty
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Option::<AnimeId>::deserialize(deserializer)
        .map(|id| id.map(AnimeId::into_string).unwrap_or_default())
}

/// Like `#[serde(default)]`, but an explicit `null` also yields the default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A year sent as a number, a numeric string, or something unusable
///
/// Anything that isn't a plausible year becomes `None` instead of failing
/// the whole record.
fn lenient_year<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .and_then(|year| i32::try_from(year).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Optional variant of [`string_or_number`], `null` maps to `None`
fn opt_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<AnimeId>::deserialize(deserializer).map(|id| id.map(AnimeId::into_string))
}

/// A catalog item as returned by the proxy API
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Anime {
    #[serde(default, deserialize_with = "null_as_default")]
    pub anime_id: AnimeId,
    /// URL slug, usable in place of the id for detail lookups
    #[serde(default)]
    pub anime_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Either a URL string or an object of sized poster URLs
    #[serde(default)]
    pub poster: Option<Value>,
    #[serde(default, deserialize_with = "lenient_year")]
    pub year: Option<i32>,
    #[serde(default, rename = "type")]
    pub kind: Option<Value>,
    #[serde(default)]
    pub rating: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
    /// Fields we don't model
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Anime {
    pub fn new(anime_id: impl Into<AnimeId>, title: impl Into<String>) -> Self {
        Self {
            anime_id: anime_id.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Best available poster URL
    pub fn poster_url(&self) -> Option<&str> {
        poster_url(self.poster.as_ref())
    }

    /// Human-readable type name ("TV Series", "Movie", ...)
    pub fn kind_name(&self) -> Option<&str> {
        kind_name(self.kind.as_ref())
    }
}

/// A genre from `/anime/genres`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Genre {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An episode video from `/anime/{id}/videos`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Video {
    #[serde(default, deserialize_with = "string_or_number")]
    pub video_id: String,
    /// Episode number; some sources use labels like "1-2"
    #[serde(default, deserialize_with = "string_or_number")]
    pub number: String,
    #[serde(default)]
    pub iframe_url: Option<String>,
    /// Player and dubbing metadata
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Homepage content bundle from `/feed`
///
/// The proxy returns named sections ("new", "announcements", ...); their
/// shapes vary, so sections are kept as raw JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Feed(pub Map<String, Value>);

impl Feed {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Section names
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn section(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
}

/// A bookmark row as stored in the remote table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bookmark {
    /// Server-generated row id
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "opt_string_or_number"
    )]
    pub id: Option<String>,
    pub user_id: String,
    pub anime_id: AnimeId,
    #[serde(default)]
    pub anime_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub poster: Option<Value>,
    #[serde(default, deserialize_with = "lenient_year")]
    pub year: Option<i32>,
    #[serde(default, rename = "type")]
    pub kind: Option<Value>,
    #[serde(default)]
    pub rating: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    pub fn poster_url(&self) -> Option<&str> {
        poster_url(self.poster.as_ref())
    }

    pub fn kind_name(&self) -> Option<&str> {
        kind_name(self.kind.as_ref())
    }

    /// Rebuild a minimal catalog item from the stored row
    pub fn to_anime(&self) -> Anime {
        Anime {
            anime_id: self.anime_id.clone(),
            anime_url: self.anime_url.clone(),
            title: self.title.clone(),
            poster: self.poster.clone(),
            year: self.year,
            kind: self.kind.clone(),
            rating: self.rating.clone(),
            ..Anime::default()
        }
    }
}

/// Insert payload for the bookmark table
///
/// The server fills in `id` and `created_at`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewBookmark {
    pub user_id: String,
    pub anime_id: AnimeId,
    pub anime_url: Option<String>,
    pub title: String,
    pub poster: Option<Value>,
    pub year: Option<i32>,
    #[serde(rename = "type")]
    pub kind: Option<Value>,
    pub rating: Option<Value>,
}

impl NewBookmark {
    pub fn from_anime(user_id: impl Into<String>, anime: &Anime) -> Self {
        Self {
            user_id: user_id.into(),
            anime_id: anime.anime_id.clone(),
            anime_url: anime.anime_url.clone(),
            title: anime.title.clone(),
            poster: anime.poster.clone(),
            year: anime.year,
            kind: anime.kind.clone(),
            rating: anime.rating.clone(),
        }
    }

    /// Materialize the row the server would return
    pub fn into_bookmark(self, id: Option<String>, created_at: DateTime<Utc>) -> Bookmark {
        Bookmark {
            id,
            user_id: self.user_id,
            anime_id: self.anime_id,
            anime_url: self.anime_url,
            title: self.title,
            poster: self.poster,
            year: self.year,
            kind: self.kind,
            rating: self.rating,
            created_at,
        }
    }
}

fn poster_url(poster: Option<&Value>) -> Option<&str> {
    match poster? {
        Value::String(url) if !url.is_empty() => Some(url),
        Value::Object(sizes) => ["medium", "big", "small", "huge", "fullsize"]
            .iter()
            .find_map(|size| sizes.get(*size).and_then(Value::as_str))
            .filter(|url| !url.is_empty()),
        _ => None,
    }
}

fn kind_name(kind: Option<&Value>) -> Option<&str> {
    match kind? {
        Value::String(name) => Some(name),
        Value::Object(fields) => fields
            .get("name")
            .or_else(|| fields.get("shortname"))
            .and_then(Value::as_str),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_anime_id_number_and_string_are_equal() {
        let from_number: AnimeId = serde_json::from_value(json!(5114)).unwrap();
        let from_string: AnimeId = serde_json::from_value(json!("5114")).unwrap();

        assert_eq!(from_number, from_string);
        assert_eq!(from_number, AnimeId::from(5114u64));
        assert_eq!(from_string, AnimeId::from(" 5114 "));
    }

    #[test]
    fn test_anime_id_float_normalizes_to_integer() {
        let id: AnimeId = serde_json::from_value(json!(42.0)).unwrap();
        assert_eq!(id.as_str(), "42");
    }

    #[test]
    fn test_anime_id_serializes_as_string() {
        let id = AnimeId::from(7u32);
        assert_eq!(serde_json::to_value(&id).unwrap(), json!("7"));
    }

    #[test]
    fn test_anime_keeps_unknown_fields() {
        let anime: Anime = serde_json::from_value(json!({
            "anime_id": 1,
            "anime_url": "fullmetal-alchemist",
            "title": "Fullmetal Alchemist",
            "poster": {"small": "s.jpg", "medium": "m.jpg"},
            "type": {"name": "TV Series", "shortname": "TV"},
            "year": 2009,
            "views": 100500
        }))
        .unwrap();

        assert_eq!(anime.anime_id.as_str(), "1");
        assert_eq!(anime.poster_url(), Some("m.jpg"));
        assert_eq!(anime.kind_name(), Some("TV Series"));
        assert_eq!(anime.extra.get("views"), Some(&json!(100500)));
    }

    #[test]
    fn test_poster_url_accepts_plain_string() {
        let anime = Anime {
            poster: Some(json!("https://cdn.example/poster.jpg")),
            ..Anime::new(1u32, "x")
        };
        assert_eq!(anime.poster_url(), Some("https://cdn.example/poster.jpg"));
    }

    #[test]
    fn test_bookmark_row_with_numeric_ids() {
        let bookmark: Bookmark = serde_json::from_value(json!({
            "id": 17,
            "user_id": "u-1",
            "anime_id": 5114,
            "anime_url": "fma",
            "title": "FMA",
            "poster": null,
            "year": 2009,
            "type": "TV",
            "rating": null,
            "created_at": "2024-05-01T10:00:00+00:00"
        }))
        .unwrap();

        assert_eq!(bookmark.id.as_deref(), Some("17"));
        assert_eq!(bookmark.anime_id, AnimeId::from("5114"));
        assert_eq!(bookmark.kind_name(), Some("TV"));
    }

    #[test]
    fn test_new_bookmark_from_anime() {
        let mut anime = Anime::new(9u32, "Mushishi");
        anime.anime_url = Some("mushishi".to_string());
        anime.year = Some(2005);

        let row = NewBookmark::from_anime("user-1", &anime);
        let value = serde_json::to_value(&row).unwrap();

        assert_eq!(value["anime_id"], json!("9"));
        assert_eq!(value["user_id"], json!("user-1"));
        assert_eq!(value["year"], json!(2005));
        assert!(value.get("type").is_some());
        assert!(value.get("created_at").is_none());
    }

    #[test]
    fn test_anime_tolerates_null_and_mistyped_fields() {
        let anime: Anime = serde_json::from_value(json!({
            "anime_id": null,
            "title": null,
            "year": "2006",
            "description": null
        }))
        .unwrap();

        assert!(anime.anime_id.is_empty());
        assert_eq!(anime.title, "");
        assert_eq!(anime.year, Some(2006));

        let anime: Anime =
            serde_json::from_value(json!({"anime_id": 3, "year": "soon"})).unwrap();
        assert_eq!(anime.year, None);

        let anime: Anime = serde_json::from_value(json!({"anime_id": 4, "year": 2011.0})).unwrap();
        assert_eq!(anime.year, Some(2011));
    }

    #[test]
    fn test_video_with_null_number() {
        let video: Video = serde_json::from_value(json!({
            "video_id": 88,
            "number": null,
            "iframe_url": "https://player.example/88"
        }))
        .unwrap();

        assert_eq!(video.video_id, "88");
        assert_eq!(video.number, "");
    }

    #[test]
    fn test_bookmark_row_with_null_title_and_string_year() {
        let bookmark: Bookmark = serde_json::from_value(json!({
            "id": 3,
            "user_id": "u-1",
            "anime_id": "12",
            "title": null,
            "year": "1998",
            "created_at": "2024-05-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(bookmark.title, "");
        assert_eq!(bookmark.year, Some(1998));
    }

    #[test]
    fn test_feed_sections() {
        let feed: Feed = serde_json::from_value(json!({"new": [], "top": []})).unwrap();
        assert!(!feed.is_empty());
        assert_eq!(feed.sections().collect::<Vec<_>>(), vec!["new", "top"]);
        assert!(Feed::default().is_empty());
    }
}
