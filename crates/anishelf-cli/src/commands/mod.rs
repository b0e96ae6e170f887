//! Command handlers and the wiring they share

pub mod anime;
pub mod auth;
pub mod bookmarks;
pub mod config;

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use anishelf_core::{
    AuthPrompt, BookmarkStore, Config, IdentityStore, SupabaseAuth, SupabaseBookmarks,
    SupabaseClient,
};

const NOT_CONFIGURED: &str = "Backend not configured. Set it with:\n  \
     anishelf config set supabase_url https://<project>.supabase.co\n  \
     anishelf config set supabase_anon_key <key>";

/// Identity restored from the saved session
pub async fn open_identity(
    config: &Config,
    open_browser: bool,
) -> Result<(IdentityStore<SupabaseAuth>, SupabaseClient)> {
    if !config.has_backend() {
        bail!(NOT_CONFIGURED);
    }
    let backend = SupabaseClient::from_config(config).context("Invalid backend configuration")?;
    let mut auth = SupabaseAuth::new(backend.clone(), config);
    if !open_browser {
        auth = auth.without_browser();
    }

    let identity = IdentityStore::new(Arc::new(auth));
    identity.initialize().await;
    Ok((identity, backend))
}

/// Signed-in user plus their bookmark mirror, loaded
pub struct Shelf {
    pub identity: IdentityStore<SupabaseAuth>,
    pub bookmarks: BookmarkStore<SupabaseBookmarks>,
}

impl Shelf {
    pub async fn open(config: &Config) -> Result<Self> {
        let (identity, backend) = open_identity(config, false).await?;
        let bookmarks = BookmarkStore::new(
            SupabaseBookmarks::new(backend),
            identity.subscribe(),
            Arc::new(AuthPrompt::default()),
        );
        bookmarks.sync_identity().await;
        Ok(Self {
            identity,
            bookmarks,
        })
    }
}

/// Ask a yes/no question; anything but "y"/"yes" (or no terminal) is no
pub fn confirm(prompt: &str) -> Result<bool> {
    if !io::stdin().is_terminal() {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}
