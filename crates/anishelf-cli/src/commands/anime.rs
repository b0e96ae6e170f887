//! Catalog browsing commands
//!
//! The API client never fails; an unreachable proxy shows up as empty
//! results.

use anyhow::{bail, Result};

use anishelf_core::routes::anime_id_from_link;
use anishelf_core::{ApiClient, Config};

use crate::output::Output;

/// Parse repeated `--filter key=value` arguments
pub fn parse_filters(raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.trim().to_string()))
            }
            _ => bail!("Invalid filter '{}'. Use key=value, e.g. limit=20", pair),
        })
        .collect()
}

pub async fn list(config: &Config, filters: Vec<String>, output: &Output) -> Result<()> {
    let filters = parse_filters(&filters)?;
    let api = ApiClient::from_config(config)?;
    output.print_anime_list(&api.get_anime(&filters).await);
    Ok(())
}

pub async fn random(config: &Config, output: &Output) -> Result<()> {
    let api = ApiClient::from_config(config)?;
    match api.get_random_anime().await {
        Some(anime) => output.print_anime(&anime),
        None => output.message("Nothing found."),
    }
    Ok(())
}

pub async fn show(config: &Config, target: String, output: &Output) -> Result<()> {
    let api = ApiClient::from_config(config)?;
    let anime_id = anime_id_from_link(&target);

    match api.get_anime_details(anime_id.as_str()).await {
        Some(anime) => output.print_anime(&anime),
        None => bail!("Anime not found: {}", anime_id),
    }
    Ok(())
}

pub async fn search(config: &Config, query: Vec<String>, output: &Output) -> Result<()> {
    let query = query.join(" ");
    if query.trim().is_empty() {
        bail!("Search query is empty");
    }

    let api = ApiClient::from_config(config)?;
    output.print_anime_list(&api.search_anime(&query).await);
    Ok(())
}

pub async fn feed(config: &Config, output: &Output) -> Result<()> {
    let api = ApiClient::from_config(config)?;
    output.print_feed(&api.get_feed().await);
    Ok(())
}

pub async fn schedule(config: &Config, output: &Output) -> Result<()> {
    let api = ApiClient::from_config(config)?;
    output.print_anime_list(&api.get_schedule().await);
    Ok(())
}

pub async fn genres(config: &Config, output: &Output) -> Result<()> {
    let api = ApiClient::from_config(config)?;
    output.print_genres(&api.get_genres().await);
    Ok(())
}

pub async fn genre(
    config: &Config,
    genre_id: String,
    filters: Vec<String>,
    output: &Output,
) -> Result<()> {
    let filters = parse_filters(&filters)?;
    let api = ApiClient::from_config(config)?;
    output.print_anime_list(&api.get_anime_by_genre(&genre_id, &filters).await);
    Ok(())
}

pub async fn videos(config: &Config, target: String, output: &Output) -> Result<()> {
    let api = ApiClient::from_config(config)?;
    let anime_id = anime_id_from_link(&target);
    output.print_videos(&api.get_anime_videos(anime_id.as_str()).await);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filters() {
        let raw = vec!["limit=20".to_string(), " sort = top ".to_string()];
        assert_eq!(
            parse_filters(&raw).unwrap(),
            vec![
                ("limit".to_string(), "20".to_string()),
                ("sort".to_string(), "top".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_filters_keeps_equals_in_value() {
        let raw = vec!["q=a=b".to_string()];
        assert_eq!(
            parse_filters(&raw).unwrap(),
            vec![("q".to_string(), "a=b".to_string())]
        );
    }

    #[test]
    fn test_parse_filters_rejects_malformed() {
        assert!(parse_filters(&["limit".to_string()]).is_err());
        assert!(parse_filters(&["=20".to_string()]).is_err());
        assert!(parse_filters(&[]).unwrap().is_empty());
    }
}
