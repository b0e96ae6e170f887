//! anishelf CLI
//!
//! Command-line interface for anishelf - browse the anime catalog and keep
//! bookmarks.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use anishelf_core::{Config, OAuthProvider};

mod commands;
mod logging;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "anishelf")]
#[command(about = "anishelf - Anime catalog and bookmarks")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with an OAuth provider
    Login {
        /// OAuth provider (google, github, discord)
        #[arg(short, long, default_value = "google")]
        provider: OAuthProvider,
        /// Finish sign-in with the URL the provider redirected to
        #[arg(long, value_name = "URL")]
        callback: Option<String>,
        /// Print the sign-in URL instead of opening a browser
        #[arg(long)]
        no_browser: bool,
    },
    /// Sign out and forget the saved session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Manage bookmarks (lists them by default)
    Bookmarks {
        #[command(subcommand)]
        command: Option<BookmarkCommands>,
    },
    /// Browse the catalog
    Anime {
        #[command(subcommand)]
        command: AnimeCommands,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum BookmarkCommands {
    /// List bookmarks, newest first
    #[command(alias = "ls")]
    List,
    /// Bookmark an anime
    Add {
        /// Anime ID or details page link
        anime: String,
    },
    /// Remove a bookmark
    #[command(alias = "rm")]
    Remove {
        /// Anime ID or details page link
        anime: String,
    },
    /// Add the bookmark if missing, remove it if present
    Toggle {
        /// Anime ID or details page link
        anime: String,
    },
    /// Remove all bookmarks
    Clear {
        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum AnimeCommands {
    /// List catalog items
    #[command(alias = "ls")]
    List {
        /// Query filter passed to the API (repeatable), e.g. limit=20
        #[arg(short, long, value_name = "KEY=VALUE")]
        filter: Vec<String>,
    },
    /// Show a random title
    Random,
    /// Show details of a title
    Show {
        /// Anime ID, URL slug or details page link
        anime: String,
    },
    /// Search by title
    Search {
        /// Search query
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Show the homepage feed sections
    Feed,
    /// Show the airing schedule
    Schedule,
    /// List genres
    Genres,
    /// List titles in a genre
    Genre {
        /// Genre ID
        id: String,
        /// Query filter passed to the API (repeatable)
        #[arg(short, long, value_name = "KEY=VALUE")]
        filter: Vec<String>,
    },
    /// List episode videos of a title
    Videos {
        /// Anime ID or details page link
        anime: String,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, api_base_url, supabase_url, ...)
        key: String,
        /// Configuration value ("none" clears optional keys)
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands work on the file directly
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    logging::init(&config);

    match cli.command {
        Commands::Login {
            provider,
            callback,
            no_browser,
        } => commands::auth::login(&config, provider, callback, no_browser, &output).await,
        Commands::Logout => commands::auth::logout(&config, &output).await,
        Commands::Whoami => commands::auth::whoami(&config, &output).await,
        Commands::Bookmarks { command } => handle_bookmark_command(command, &config, &output).await,
        Commands::Anime { command } => handle_anime_command(command, &config, &output).await,
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

async fn handle_bookmark_command(
    command: Option<BookmarkCommands>,
    config: &Config,
    output: &Output,
) -> Result<()> {
    match command {
        Some(BookmarkCommands::List) | None => commands::bookmarks::list(config, output).await,
        Some(BookmarkCommands::Add { anime }) => {
            commands::bookmarks::add(config, anime, output).await
        }
        Some(BookmarkCommands::Remove { anime }) => {
            commands::bookmarks::remove(config, anime, output).await
        }
        Some(BookmarkCommands::Toggle { anime }) => {
            commands::bookmarks::toggle(config, anime, output).await
        }
        Some(BookmarkCommands::Clear { yes }) => {
            commands::bookmarks::clear(config, yes, output).await
        }
    }
}

async fn handle_anime_command(
    command: AnimeCommands,
    config: &Config,
    output: &Output,
) -> Result<()> {
    match command {
        AnimeCommands::List { filter } => commands::anime::list(config, filter, output).await,
        AnimeCommands::Random => commands::anime::random(config, output).await,
        AnimeCommands::Show { anime } => commands::anime::show(config, anime, output).await,
        AnimeCommands::Search { query } => commands::anime::search(config, query, output).await,
        AnimeCommands::Feed => commands::anime::feed(config, output).await,
        AnimeCommands::Schedule => commands::anime::schedule(config, output).await,
        AnimeCommands::Genres => commands::anime::genres(config, output).await,
        AnimeCommands::Genre { id, filter } => {
            commands::anime::genre(config, id, filter, output).await
        }
        AnimeCommands::Videos { anime } => commands::anime::videos(config, anime, output).await,
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_login_provider() {
        let cli = Cli::try_parse_from(["anishelf", "login", "--provider", "github"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Login {
                provider: OAuthProvider::Github,
                callback: None,
                no_browser: false
            }
        ));

        let cli = Cli::try_parse_from(["anishelf", "login"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Login {
                provider: OAuthProvider::Google,
                ..
            }
        ));

        assert!(Cli::try_parse_from(["anishelf", "login", "-p", "myspace"]).is_err());
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["anishelf", "bookmarks", "ls", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Bookmarks {
                command: Some(BookmarkCommands::List)
            }
        ));
    }

    #[test]
    fn test_parse_repeated_filters() {
        let cli = Cli::try_parse_from([
            "anishelf", "anime", "list", "-f", "limit=5", "--filter", "sort=top",
        ])
        .unwrap();
        match cli.command {
            Commands::Anime {
                command: AnimeCommands::List { filter },
            } => assert_eq!(filter, vec!["limit=5", "sort=top"]),
            _ => panic!("expected anime list"),
        }
    }
}
