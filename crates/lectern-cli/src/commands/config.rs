//! `lectern config` command implementation
//!
//! Shows the effective configuration after file, environment, and flags.

use colored::Colorize;

use super::CommandContext;
use crate::config::{Config, CONFIG_PATH_ENV_VAR};
use crate::error::Result;

/// Get configuration value
pub async fn get(ctx: &CommandContext, key: &str) -> Result<()> {
    println!("{}", ctx.config.get(key)?);
    Ok(())
}

/// Show all configuration
pub async fn show(ctx: &CommandContext) -> Result<()> {
    let config = &ctx.config;

    println!("{}", "Lectern CLI Configuration:".cyan().bold());
    println!();
    for key in KEYS {
        println!("{:<22} {}", format!("{}:", key), config.get(key)?);
    }
    println!();
    println!("{}", "Environment Variables:".cyan());
    for key in KEYS.iter().filter(|k| **k != "verbose") {
        println!("  {}", format_env_var(key));
    }
    println!("  {}", CONFIG_PATH_ENV_VAR);

    Ok(())
}

/// Print the config file location
pub async fn path() -> Result<()> {
    match Config::default_path() {
        Some(path) => {
            let state = if path.exists() { "" } else { " (not present)" };
            println!("{}{}", path.display(), state);
        },
        None => println!("No config directory on this platform; use {}", CONFIG_PATH_ENV_VAR),
    }
    Ok(())
}

const KEYS: &[&str] = &[
    "server_url",
    "api_prefix",
    "api_timeout_secs",
    "upload_timeout_secs",
    "max_upload_bytes",
    "credential_ttl_secs",
    "ffprobe_path",
    "verbose",
];

/// Format config key as environment variable name
fn format_env_var(key: &str) -> String {
    format!("LECTERN_{}", key.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use std::sync::Arc;

    #[test]
    fn test_format_env_var() {
        assert_eq!(format_env_var("server_url"), "LECTERN_SERVER_URL");
        assert_eq!(format_env_var("ffprobe_path"), "LECTERN_FFPROBE_PATH");
    }

    #[test]
    fn test_every_listed_key_resolves() {
        let config = Config::default();
        for key in KEYS {
            assert!(config.get(key).is_ok(), "{key} should resolve");
        }
    }

    #[tokio::test]
    async fn test_config_show() {
        let ctx = CommandContext::new(Config::default(), Arc::new(StaticToken::new("t")));
        assert!(show(&ctx).await.is_ok());
        assert!(get(&ctx, "nope").await.is_err());
    }
}
