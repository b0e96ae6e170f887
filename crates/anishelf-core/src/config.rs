//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/anishelf/config.toml)
//! 3. Environment variables (ANISHELF_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::api::DEFAULT_API_BASE;

/// Environment variable prefix
const ENV_PREFIX: &str = "ANISHELF";

/// Where the OAuth provider sends the browser after sign-in
const DEFAULT_REDIRECT_URL: &str = "http://localhost:5173";

/// Keys accepted by [`Config::set`]
pub const CONFIG_KEYS: &[&str] = &[
    "data_dir",
    "api_base_url",
    "supabase_url",
    "supabase_anon_key",
    "redirect_url",
    "request_timeout_secs",
    "log_file",
];

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Directory for local state (session file)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Base URL of the anime proxy API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Backend project URL (auth + bookmark table)
    #[serde(default)]
    pub supabase_url: Option<String>,

    /// Public (anon) API key of the backend project
    #[serde(default)]
    pub supabase_anon_key: Option<String>,

    /// OAuth redirect target
    #[serde(default = "default_redirect_url")]
    pub redirect_url: String,

    /// Timeout for catalog API requests; unset means no timeout
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Log file path (defaults to stderr when logging is enabled)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            api_base_url: default_api_base_url(),
            supabase_url: None,
            supabase_anon_key: None,
            redirect_url: default_redirect_url(),
            request_timeout_secs: None,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (ANISHELF_DATA_DIR, ANISHELF_API_URL, ...)
    /// 2. Config file (~/.config/anishelf/config.toml or ANISHELF_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_API_URL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.api_base_url = val;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_SUPABASE_URL", ENV_PREFIX)) {
            self.supabase_url = non_empty(val);
        }

        if let Ok(val) = std::env::var(format!("{}_SUPABASE_ANON_KEY", ENV_PREFIX)) {
            self.supabase_anon_key = non_empty(val);
        }

        if let Ok(val) = std::env::var(format!("{}_REDIRECT_URL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.redirect_url = val;
            }
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Set a value by key, as used by `anishelf config set`
    ///
    /// Optional values are cleared with an empty string or "none".
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "data_dir" => self.data_dir = PathBuf::from(value),
            "api_base_url" => {
                if value.is_empty() || value == "none" {
                    self.api_base_url = default_api_base_url();
                } else {
                    self.api_base_url = value.to_string();
                }
            }
            "supabase_url" => self.supabase_url = optional(value),
            "supabase_anon_key" => self.supabase_anon_key = optional(value),
            "redirect_url" => {
                if value.is_empty() || value == "none" {
                    self.redirect_url = default_redirect_url();
                } else {
                    self.redirect_url = value.to_string();
                }
            }
            "request_timeout_secs" => {
                self.request_timeout_secs = match optional(value) {
                    Some(secs) => Some(
                        secs.parse()
                            .context("Invalid value for request_timeout_secs. Use a number of seconds.")?,
                    ),
                    None => None,
                };
            }
            "log_file" => self.log_file = optional(value).map(PathBuf::from),
            _ => {
                bail!(
                    "Unknown configuration key: '{}'\nValid keys: {}",
                    key,
                    CONFIG_KEYS.join(", ")
                );
            }
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with ANISHELF_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("anishelf")
            .join("config.toml")
    }

    /// Get the path to the persisted auth session
    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    /// Whether the auth/bookmark backend is configured
    pub fn has_backend(&self) -> bool {
        self.supabase_url.is_some() && self.supabase_anon_key.is_some()
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("anishelf")
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_redirect_url() -> String {
    DEFAULT_REDIRECT_URL.to_string()
}
