//! Sign-in, sign-out and whoami

use anyhow::{Context, Result};

use anishelf_core::{Config, OAuthProvider};

use super::open_identity;
use crate::output::{Output, OutputFormat};

/// Start the OAuth flow, or finish it from the redirect URL
pub async fn login(
    config: &Config,
    provider: OAuthProvider,
    callback: Option<String>,
    no_browser: bool,
    output: &Output,
) -> Result<()> {
    let (identity, _) = open_identity(config, !no_browser).await?;

    if let Some(callback) = callback {
        let session = identity
            .provider()
            .complete_oauth(&callback)
            .await
            .context("Sign-in failed")?;
        let profile = session.user.profile();
        output.success(&format!(
            "Signed in as {}",
            profile.username.as_deref().unwrap_or(&profile.id)
        ));
        if !output.is_json() {
            output.print_profile(&profile);
        }
        return Ok(());
    }

    if let Some(profile) = identity.profile() {
        output.message(&format!(
            "Already signed in as {}. Run `anishelf logout` to switch accounts.",
            profile.username.as_deref().unwrap_or(&profile.id)
        ));
        return Ok(());
    }

    let url = identity
        .login_with_oauth(provider)
        .await
        .context("Failed to start sign-in")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({"provider": provider.as_str(), "authorize_url": url})
            );
        }
        OutputFormat::Quiet => println!("{}", url),
        OutputFormat::Human => {
            if no_browser {
                println!("Open this URL to sign in with {}:", provider);
            } else {
                println!("Opened your browser to sign in with {}. If it didn't open, visit:", provider);
            }
            println!("  {}", url);
            println!();
            println!("After signing in, copy the address you were redirected to and run:");
            println!("  anishelf login --callback '<redirected URL>'");
        }
    }
    Ok(())
}

pub async fn logout(config: &Config, output: &Output) -> Result<()> {
    let (identity, _) = open_identity(config, false).await?;

    if !identity.is_logged_in() {
        output.message("Not signed in.");
        return Ok(());
    }

    identity.logout().await;
    output.success("Signed out");
    Ok(())
}

pub async fn whoami(config: &Config, output: &Output) -> Result<()> {
    let (identity, _) = open_identity(config, false).await?;

    match identity.profile() {
        Some(profile) => output.print_profile(&profile),
        None => match output.format {
            OutputFormat::Json => println!("{}", serde_json::json!({"logged_in": false})),
            OutputFormat::Quiet => {}
            OutputFormat::Human => println!("Not signed in. Run `anishelf login` to sign in."),
        },
    }
    Ok(())
}
