//! Config command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};

use anishelf_core::Config;

use crate::output::{Output, OutputFormat};

fn or_unset(value: Option<&str>) -> &str {
    value.unwrap_or("(not set)")
}

/// Show the anon key only by its first characters
fn masked(key: &str) -> String {
    let prefix: String = key.chars().take(6).collect();
    format!("{}…", prefix)
}

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "api_base_url": config.api_base_url,
                    "supabase_url": config.supabase_url,
                    "supabase_anon_key": config.supabase_anon_key.as_deref().map(masked),
                    "redirect_url": config.redirect_url,
                    "request_timeout_secs": config.request_timeout_secs,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            let anon_key = config.supabase_anon_key.as_deref().map(masked);
            let timeout = config.request_timeout_secs.map(|s| format!("{}s", s));
            let log_file = config.log_file.as_ref().map(|p| p.display().to_string());

            println!("Configuration:");
            println!("  data_dir:             {}", config.data_dir.display());
            println!("  api_base_url:         {}", config.api_base_url);
            println!("  supabase_url:         {}", or_unset(config.supabase_url.as_deref()));
            println!("  supabase_anon_key:    {}", or_unset(anon_key.as_deref()));
            println!("  redirect_url:         {}", config.redirect_url);
            println!("  request_timeout_secs: {}", or_unset(timeout.as_deref()));
            println!("  log_file:             {}", or_unset(log_file.as_deref()));
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    config.set(&key, &value)?;

    // Save to the CLI-specified path or default
    match config_path {
        Some(path) => config.save_to_path(path),
        None => config.save(),
    }
    .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_key() {
        assert_eq!(masked("eyJhbGciOiJIUzI1NiJ9.payload"), "eyJhbG…");
        assert_eq!(masked("abc"), "abc…");
    }

    /// A config file whose data_dir lives in the temp dir
    fn temp_config(temp_dir: &tempfile::TempDir) -> PathBuf {
        let path = temp_dir.path().join("config.toml");
        let data_dir = temp_dir.path().join("data");
        std::fs::write(&path, format!("data_dir = {:?}\n", data_dir)).unwrap();
        path
    }

    #[test]
    fn test_set_writes_to_given_path() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_config(&temp_dir);
        let output = Output::new(OutputFormat::Quiet);

        set(
            "request_timeout_secs".to_string(),
            "15".to_string(),
            Some(&path),
            &output,
        )
        .unwrap();

        let saved = Config::load_from_path(&path).unwrap();
        assert_eq!(saved.request_timeout_secs, Some(15));
        assert_eq!(saved.data_dir, temp_dir.path().join("data"));
    }

    #[test]
    fn test_set_rejects_unknown_key() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_config(&temp_dir);
        let before = std::fs::read_to_string(&path).unwrap();
        let output = Output::new(OutputFormat::Quiet);

        let err = set("colour".to_string(), "red".to_string(), Some(&path), &output);
        assert!(err.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }
}
