//! Client-side routes and navigation history
//!
//! Routes map one-to-one onto the app's pages. `History` is the back stack:
//! a fresh navigation starts at the top of the page, going back returns to
//! where the user had scrolled.

use std::fmt;

use reqwest::Url;

use crate::models::AnimeId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    AnimeDetails { id: AnimeId },
    Catalog,
    Search,
    Schedule,
    Bookmarks,
}

impl Route {
    /// Match a path like `/anime/42`; query string and fragment are ignored
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Some(Route::Home),
            ["anime", id] => Some(Route::AnimeDetails {
                id: AnimeId::new(id),
            }),
            ["catalog"] => Some(Route::Catalog),
            ["search"] => Some(Route::Search),
            ["schedule"] => Some(Route::Schedule),
            ["bookmarks"] => Some(Route::Bookmarks),
            _ => None,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::AnimeDetails { id } => format!("/anime/{}", id),
            Route::Catalog => "/catalog".to_string(),
            Route::Search => "/search".to_string(),
            Route::Schedule => "/schedule".to_string(),
            Route::Bookmarks => "/bookmarks".to_string(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Route::Home => "Home",
            Route::AnimeDetails { .. } => "AnimeDetails",
            Route::Catalog => "Catalog",
            Route::Search => "Search",
            Route::Schedule => "Schedule",
            Route::Bookmarks => "Bookmarks",
        }
    }

    /// Whether the page is loaded on first visit rather than up front
    pub fn is_lazy(&self) -> bool {
        !matches!(self, Route::Home)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Resolve user input that is either a bare id or a link to a details page
///
/// `42`, `/anime/42` and `https://host/anime/42?tab=videos` all give `42`.
pub fn anime_id_from_link(input: &str) -> AnimeId {
    let input = input.trim();
    let path = match Url::parse(input) {
        Ok(url) => url.path().to_string(),
        Err(_) => input.to_string(),
    };
    match Route::parse(&path) {
        Some(Route::AnimeDetails { id }) => id,
        _ => AnimeId::new(input),
    }
}

/// Back stack with saved scroll offsets
#[derive(Debug, Clone)]
pub struct History {
    current: Route,
    scroll: usize,
    back: Vec<(Route, usize)>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(Route::Home)
    }
}

impl History {
    pub fn new(start: Route) -> Self {
        Self {
            current: start,
            scroll: 0,
            back: Vec::new(),
        }
    }

    pub fn current(&self) -> &Route {
        &self.current
    }

    /// Scroll offset of the current page
    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn set_scroll(&mut self, offset: usize) {
        self.scroll = offset;
    }

    pub fn can_go_back(&self) -> bool {
        !self.back.is_empty()
    }

    /// Go to `route`, remembering where we were; returns the offset to show
    ///
    /// Navigating to the page already shown is a no-op.
    pub fn navigate(&mut self, route: Route) -> usize {
        if route == self.current {
            return self.scroll;
        }
        let previous = std::mem::replace(&mut self.current, route);
        self.back.push((previous, self.scroll));
        self.scroll = 0;
        self.scroll
    }

    /// Return to the previous page and its saved offset
    pub fn back(&mut self) -> Option<usize> {
        let (route, offset) = self.back.pop()?;
        self.current = route;
        self.scroll = offset;
        Some(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_routes() {
        assert_eq!(Route::parse("/"), Some(Route::Home));
        assert_eq!(Route::parse(""), Some(Route::Home));
        assert_eq!(Route::parse("/catalog"), Some(Route::Catalog));
        assert_eq!(Route::parse("/search?q=bebop"), Some(Route::Search));
        assert_eq!(Route::parse("/schedule/"), Some(Route::Schedule));
        assert_eq!(Route::parse("/bookmarks#top"), Some(Route::Bookmarks));
        assert_eq!(
            Route::parse("/anime/42"),
            Some(Route::AnimeDetails {
                id: AnimeId::from("42")
            })
        );
        assert_eq!(Route::parse("/anime"), None);
        assert_eq!(Route::parse("/anime/42/videos"), None);
        assert_eq!(Route::parse("/settings"), None);
    }

    #[test]
    fn test_path_roundtrip() {
        let routes = [
            Route::Home,
            Route::AnimeDetails {
                id: AnimeId::from("cowboy-bebop"),
            },
            Route::Catalog,
            Route::Search,
            Route::Schedule,
            Route::Bookmarks,
        ];
        for route in routes {
            assert_eq!(Route::parse(&route.path()), Some(route));
        }
    }

    #[test]
    fn test_only_home_is_eager() {
        assert!(!Route::Home.is_lazy());
        assert!(Route::Catalog.is_lazy());
        assert!(Route::AnimeDetails {
            id: AnimeId::from(1u32)
        }
        .is_lazy());
        assert_eq!(Route::Bookmarks.name(), "Bookmarks");
    }

    #[test]
    fn test_anime_id_from_link() {
        assert_eq!(anime_id_from_link("42"), AnimeId::from("42"));
        assert_eq!(anime_id_from_link(" /anime/42 "), AnimeId::from("42"));
        assert_eq!(
            anime_id_from_link("https://anishelf.example/anime/42?tab=videos"),
            AnimeId::from("42")
        );
        assert_eq!(anime_id_from_link("cowboy-bebop"), AnimeId::from("cowboy-bebop"));
    }

    #[test]
    fn test_navigation_resets_scroll() {
        let mut history = History::default();
        history.set_scroll(640);

        assert_eq!(history.navigate(Route::Catalog), 0);
        assert_eq!(history.current(), &Route::Catalog);
        assert_eq!(history.scroll(), 0);
        assert!(history.can_go_back());
    }

    #[test]
    fn test_back_restores_saved_scroll() {
        let mut history = History::default();
        history.set_scroll(640);
        history.navigate(Route::Catalog);
        history.set_scroll(120);
        history.navigate(Route::AnimeDetails {
            id: AnimeId::from("42"),
        });

        assert_eq!(history.back(), Some(120));
        assert_eq!(history.current(), &Route::Catalog);
        assert_eq!(history.back(), Some(640));
        assert_eq!(history.current(), &Route::Home);
        assert_eq!(history.back(), None);
        assert_eq!(history.scroll(), 640);
    }

    #[test]
    fn test_navigate_to_current_page_keeps_position() {
        let mut history = History::new(Route::Search);
        history.set_scroll(80);

        assert_eq!(history.navigate(Route::Search), 80);
        assert!(!history.can_go_back());
    }
}
