//! Logging setup
//!
//! Logging is off unless ANISHELF_LOG is set to a level or filter
//! (e.g. `debug`). Output goes to `log_file` when configured, else stderr.

use std::fs::OpenOptions;

use tracing::info;
use tracing_subscriber::EnvFilter;

use anishelf_core::Config;

/// Environment variable that enables logging
const LOG_ENV: &str = "ANISHELF_LOG";

pub fn init(config: &Config) {
    let Ok(log_level) = std::env::var(LOG_ENV) else {
        return;
    };

    let env_filter = EnvFilter::new(filter_directives(&log_level));

    match &config.log_file {
        Some(log_path) => {
            let log_file = match OpenOptions::new().create(true).append(true).open(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
                    return;
                }
            };
            // Ignore error if already initialized
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(log_file)
                .try_init();
            info!("Logging to {:?}", log_path);
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}

/// A bare level applies to our crates only; anything else is a full filter
fn filter_directives(value: &str) -> String {
    let value = value.trim();
    if value.contains('=') || value.contains(',') {
        value.to_string()
    } else {
        format!("anishelf_core={},anishelf_cli={}", value, value)
    }
}
