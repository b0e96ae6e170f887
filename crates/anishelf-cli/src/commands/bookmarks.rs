//! Bookmark command handlers

use anyhow::{anyhow, bail, Result};

use anishelf_core::routes::anime_id_from_link;
use anishelf_core::{Anime, AnimeId, ApiClient, BookmarkError, Config, Toggled};

use super::{confirm, Shelf};
use crate::output::Output;

const SIGN_IN_HINT: &str = "Sign in to manage bookmarks. Run `anishelf login` first.";

/// Turn a store error into a CLI error, with a hint for the auth case
fn explain(err: BookmarkError) -> anyhow::Error {
    if err.needs_auth() {
        anyhow!(SIGN_IN_HINT)
    } else {
        anyhow!(err)
    }
}

/// The item to bookmark: from the mirror if present, else from the catalog
async fn resolve_anime(config: &Config, shelf: &Shelf, anime_id: &AnimeId) -> Result<Anime> {
    if let Some(bookmark) = shelf
        .bookmarks
        .bookmarks()
        .into_iter()
        .find(|b| &b.anime_id == anime_id)
    {
        return Ok(bookmark.to_anime());
    }

    let api = ApiClient::from_config(config)?;
    api.get_anime_details(anime_id.as_str())
        .await
        .ok_or_else(|| anyhow!("Anime not found: {}", anime_id))
}

pub async fn list(config: &Config, output: &Output) -> Result<()> {
    let shelf = Shelf::open(config).await?;
    if !shelf.identity.is_logged_in() {
        bail!(SIGN_IN_HINT);
    }

    output.print_bookmarks(&shelf.bookmarks.bookmarks());
    Ok(())
}

pub async fn add(config: &Config, target: String, output: &Output) -> Result<()> {
    let shelf = Shelf::open(config).await?;
    if !shelf.identity.is_logged_in() {
        bail!(SIGN_IN_HINT);
    }

    let anime_id = anime_id_from_link(&target);
    let anime = resolve_anime(config, &shelf, &anime_id).await?;

    match shelf.bookmarks.add(&anime).await {
        Ok(bookmark) => {
            output.success(&format!("Bookmarked: {}", bookmark.title));
            Ok(())
        }
        Err(e) if e.is_duplicate() => {
            output.message(&format!("Already bookmarked: {}", anime.title));
            Ok(())
        }
        Err(e) => Err(explain(e)),
    }
}

pub async fn remove(config: &Config, target: String, output: &Output) -> Result<()> {
    let shelf = Shelf::open(config).await?;
    let anime_id = anime_id_from_link(&target);

    shelf.bookmarks.remove(&anime_id).await.map_err(explain)?;
    output.success(&format!("Removed bookmark: {}", anime_id));
    Ok(())
}

pub async fn toggle(config: &Config, target: String, output: &Output) -> Result<()> {
    let shelf = Shelf::open(config).await?;
    if !shelf.identity.is_logged_in() {
        bail!(SIGN_IN_HINT);
    }

    let anime_id = anime_id_from_link(&target);
    let anime = resolve_anime(config, &shelf, &anime_id).await?;

    match shelf.bookmarks.toggle(&anime).await.map_err(explain)? {
        Toggled::Added(bookmark) => output.success(&format!("Bookmarked: {}", bookmark.title)),
        Toggled::Removed(id) => output.success(&format!("Removed bookmark: {}", id)),
    }
    Ok(())
}

pub async fn clear(config: &Config, yes: bool, output: &Output) -> Result<()> {
    let shelf = Shelf::open(config).await?;
    if !shelf.identity.is_logged_in() {
        bail!(SIGN_IN_HINT);
    }

    let count = shelf.bookmarks.len();
    if count == 0 {
        output.message("No bookmarks to clear.");
        return Ok(());
    }

    if !yes {
        if !output.should_prompt() {
            bail!("Refusing to clear bookmarks without --yes");
        }
        if !confirm(&format!("Delete all {} bookmark(s)?", count))? {
            output.message("Cancelled.");
            return Ok(());
        }
    }

    shelf.bookmarks.clear_all().await.map_err(explain)?;
    output.success(&format!("Cleared {} bookmark(s)", count));
    Ok(())
}
