//! Bearer token sources
//!
//! Session bootstrap lives outside this tool; commands only need a token to
//! attach to API calls. The provider is handed to the [`ApiClient`] when it
//! is built, and is asked for the token right before each request.
//!
//! [`ApiClient`]: crate::api::ApiClient

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{CliError, Result};

/// Environment variable holding the access token
pub const TOKEN_ENV_VAR: &str = "LECTERN_ACCESS_TOKEN";

/// Supplies the bearer token for API calls
pub trait TokenProvider: Send + Sync {
    fn bearer_token(&self) -> Result<String>;
}

/// A token fixed at startup (e.g. `--token`)
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(***)")
    }
}

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Result<String> {
        non_empty(self.0.clone(), "the provided token is empty")
    }
}

/// Reads the token from an environment variable on every call
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvToken {
    fn default() -> Self {
        Self::new(TOKEN_ENV_VAR)
    }
}

impl TokenProvider for EnvToken {
    fn bearer_token(&self) -> Result<String> {
        let token = std::env::var(&self.var)
            .map_err(|_| CliError::MissingToken(format!("{} is not set", self.var)))?;
        non_empty(token, &format!("{} is empty", self.var))
    }
}

/// Reads the token from a file (surrounding whitespace is ignored)
#[derive(Debug, Clone)]
pub struct FileToken {
    path: PathBuf,
}

impl FileToken {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenProvider for FileToken {
    fn bearer_token(&self) -> Result<String> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            CliError::MissingToken(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        non_empty(
            raw.trim().to_string(),
            &format!("{} is empty", self.path.display()),
        )
    }
}

fn non_empty(token: String, reason: &str) -> Result<String> {
    if token.trim().is_empty() {
        return Err(CliError::MissingToken(reason.to_string()));
    }
    Ok(token)
}

/// Pick a provider: explicit token, then token file, then the environment
pub fn resolve_provider(token: Option<String>, token_file: Option<PathBuf>) -> Arc<dyn TokenProvider> {
    match (token, token_file) {
        (Some(token), _) => Arc::new(StaticToken::new(token)),
        (None, Some(path)) => Arc::new(FileToken::new(path)),
        (None, None) => Arc::new(EnvToken::default()),
    }
}
