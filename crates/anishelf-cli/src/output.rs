//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;
use serde_json::Value;

use anishelf_core::{Anime, Bookmark, Feed, Genre, UserProfile, Video};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print any serializable value as pretty JSON
    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to encode output: {}", e),
        }
    }

    /// Print a single catalog item
    pub fn print_anime(&self, anime: &Anime) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:          {}", anime.anime_id);
                println!("Title:       {}", anime.title);
                if let Some(ref slug) = anime.anime_url {
                    println!("Slug:        {}", slug);
                }
                if let Some(year) = anime.year {
                    println!("Year:        {}", year);
                }
                if let Some(kind) = anime.kind_name() {
                    println!("Type:        {}", kind);
                }
                if let Some(rating) = anime.rating.as_ref().and_then(rating_text) {
                    println!("Rating:      {}", rating);
                }
                if let Some(poster) = anime.poster_url() {
                    println!("Poster:      {}", poster);
                }
                if let Some(ref desc) = anime.description {
                    println!();
                    println!("{}", desc.trim());
                }
            }
            OutputFormat::Json => self.print_json(anime),
            OutputFormat::Quiet => println!("{}", anime.anime_id),
        }
    }

    /// Print a list of catalog items
    pub fn print_anime_list(&self, items: &[Anime]) {
        match self.format {
            OutputFormat::Human => {
                if items.is_empty() {
                    println!("No anime found.");
                    return;
                }
                for anime in items {
                    println!(
                        "{:>8} | {:<45} | {}",
                        anime.anime_id.as_str(),
                        truncate(&anime.title, 45),
                        summary(anime.year, anime.kind_name())
                    );
                }
                println!("\n{} title(s)", items.len());
            }
            OutputFormat::Json => self.print_json(items),
            OutputFormat::Quiet => {
                for anime in items {
                    println!("{}", anime.anime_id);
                }
            }
        }
    }

    /// Print the user's bookmarks, newest first
    pub fn print_bookmarks(&self, bookmarks: &[Bookmark]) {
        match self.format {
            OutputFormat::Human => {
                if bookmarks.is_empty() {
                    println!("No bookmarks yet.");
                    return;
                }
                for bookmark in bookmarks {
                    println!(
                        "{:>8} | {:<45} | {} | {}",
                        bookmark.anime_id.as_str(),
                        truncate(&bookmark.title, 45),
                        summary(bookmark.year, bookmark.kind_name()),
                        bookmark.created_at.format("%Y-%m-%d")
                    );
                }
                println!("\n{} bookmark(s)", bookmarks.len());
            }
            OutputFormat::Json => self.print_json(bookmarks),
            OutputFormat::Quiet => {
                for bookmark in bookmarks {
                    println!("{}", bookmark.anime_id);
                }
            }
        }
    }

    /// Print the signed-in user's profile
    pub fn print_profile(&self, profile: &UserProfile) {
        match self.format {
            OutputFormat::Human => {
                println!("User ID:  {}", profile.id);
                if let Some(ref username) = profile.username {
                    println!("Username: {}", username);
                }
                if let Some(ref email) = profile.email {
                    println!("Email:    {}", email);
                }
                let full_name: Vec<&str> = [&profile.given_name, &profile.family_name]
                    .into_iter()
                    .filter_map(|part| part.as_deref())
                    .collect();
                if !full_name.is_empty() {
                    println!("Name:     {}", full_name.join(" "));
                }
                if let Some(ref avatar) = profile.avatar {
                    println!("Avatar:   {}", avatar);
                }
            }
            OutputFormat::Json => self.print_json(profile),
            OutputFormat::Quiet => println!("{}", profile.id),
        }
    }

    pub fn print_genres(&self, genres: &[Genre]) {
        match self.format {
            OutputFormat::Human => {
                if genres.is_empty() {
                    println!("No genres found.");
                    return;
                }
                for genre in genres {
                    println!("{:>5} | {}", genre.id, genre.title);
                }
                println!("\n{} genre(s)", genres.len());
            }
            OutputFormat::Json => self.print_json(genres),
            OutputFormat::Quiet => {
                for genre in genres {
                    println!("{}", genre.id);
                }
            }
        }
    }

    pub fn print_videos(&self, videos: &[Video]) {
        match self.format {
            OutputFormat::Human => {
                if videos.is_empty() {
                    println!("No videos found.");
                    return;
                }
                for video in videos {
                    println!(
                        "Episode {:>4} | {}",
                        video.number,
                        video.iframe_url.as_deref().unwrap_or("-")
                    );
                }
                println!("\n{} video(s)", videos.len());
            }
            OutputFormat::Json => self.print_json(videos),
            OutputFormat::Quiet => {
                for video in videos {
                    println!("{}", video.video_id);
                }
            }
        }
    }

    /// Print the homepage feed, one line per section
    pub fn print_feed(&self, feed: &Feed) {
        match self.format {
            OutputFormat::Human => {
                if feed.is_empty() {
                    println!("Feed is empty.");
                    return;
                }
                for name in feed.sections() {
                    let size = match feed.section(name) {
                        Some(Value::Array(items)) => format!("{} item(s)", items.len()),
                        Some(Value::Object(fields)) => format!("{} field(s)", fields.len()),
                        _ => "-".to_string(),
                    };
                    println!("{:<20} {}", name, size);
                }
            }
            OutputFormat::Json => self.print_json(feed),
            OutputFormat::Quiet => {
                for name in feed.sections() {
                    println!("{}", name);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// "2004 · TV Series", or whichever half is known
fn summary(year: Option<i32>, kind: Option<&str>) -> String {
    match (year, kind) {
        (Some(year), Some(kind)) => format!("{} · {}", year, kind),
        (Some(year), None) => year.to_string(),
        (None, Some(kind)) => kind.to_string(),
        (None, None) => "-".to_string(),
    }
}

/// Ratings come as a bare number, a string, or an object with an `average`
fn rating_text(rating: &Value) -> Option<String> {
    match rating {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(fields) => fields.get("average").and_then(rating_text),
        _ => None,
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        // Multi-byte titles are cut on character boundaries
        assert_eq!(truncate("進撃の巨人 The Final Season", 8), "進撃の巨人...");
    }

    #[test]
    fn test_summary() {
        assert_eq!(summary(Some(1998), Some("TV Series")), "1998 · TV Series");
        assert_eq!(summary(Some(1998), None), "1998");
        assert_eq!(summary(None, Some("Movie")), "Movie");
        assert_eq!(summary(None, None), "-");
    }

    #[test]
    fn test_rating_text() {
        assert_eq!(rating_text(&json!(8.7)).as_deref(), Some("8.7"));
        assert_eq!(rating_text(&json!("PG-13")).as_deref(), Some("PG-13"));
        assert_eq!(
            rating_text(&json!({"average": 9.1, "counters": 1200})).as_deref(),
            Some("9.1")
        );
        assert_eq!(rating_text(&json!(null)), None);
        assert_eq!(rating_text(&json!("")), None);
    }
}
