//! Configuration management for the Lectern CLI
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `LECTERN_*` environment variables, then command-line flags.

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// CLI Configuration Constants
// ============================================================================

/// Default course platform URL
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";

/// Versioned API prefix the lesson endpoints live under
pub const DEFAULT_API_PREFIX: &str = "/api/v1";

/// Timeout for ordinary API calls
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

/// Timeout for the direct-to-storage transfer
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 3600;

/// Largest file accepted for upload (500 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 500 * 1024 * 1024;

/// Assumed presigned URL lifetime when the URL itself does not say
pub const DEFAULT_CREDENTIAL_TTL_SECS: u64 = 15 * 60;

/// Environment variable pointing at an explicit config file
pub const CONFIG_PATH_ENV_VAR: &str = "LECTERN_CONFIG";

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Course platform base URL
    pub server_url: String,

    /// Path prefix of the versioned API
    pub api_prefix: String,

    pub api_timeout_secs: u64,

    pub upload_timeout_secs: u64,

    pub max_upload_bytes: u64,

    pub credential_ttl_secs: u64,

    /// ffprobe binary used to read video durations
    pub ffprobe_path: String,

    #[serde(skip)]
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            api_timeout_secs: DEFAULT_API_TIMEOUT_SECS,
            upload_timeout_secs: DEFAULT_UPLOAD_TIMEOUT_SECS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            credential_ttl_secs: DEFAULT_CREDENTIAL_TTL_SECS,
            ffprobe_path: "ffprobe".to_string(),
            verbose: false,
        }
    }
}

impl Config {
    /// Defaults, then the config file if one exists, then the environment
    pub fn load() -> Result<Self> {
        let mut config = match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Load config from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Read a TOML config file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw)?;
        Ok(config)
    }

    /// `$LECTERN_CONFIG`, else `<config dir>/lectern/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV_VAR) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("lectern").join("config.toml"))
    }

    /// Override fields from `LECTERN_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("LECTERN_SERVER_URL") {
            self.server_url = url;
        }

        if let Ok(prefix) = std::env::var("LECTERN_API_PREFIX") {
            self.api_prefix = prefix;
        }

        if let Some(secs) = env_u64("LECTERN_API_TIMEOUT_SECS")? {
            self.api_timeout_secs = secs;
        }

        if let Some(secs) = env_u64("LECTERN_UPLOAD_TIMEOUT_SECS")? {
            self.upload_timeout_secs = secs;
        }

        if let Some(bytes) = env_u64("LECTERN_MAX_UPLOAD_BYTES")? {
            self.max_upload_bytes = bytes;
        }

        if let Some(secs) = env_u64("LECTERN_CREDENTIAL_TTL_SECS")? {
            self.credential_ttl_secs = secs;
        }

        if let Ok(path) = std::env::var("LECTERN_FFPROBE_PATH") {
            self.ffprobe_path = path;
        }

        Ok(())
    }

    /// Look up a single key by its config-file name
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "server_url" => self.server_url.clone(),
            "api_prefix" => self.api_prefix.clone(),
            "api_timeout_secs" => self.api_timeout_secs.to_string(),
            "upload_timeout_secs" => self.upload_timeout_secs.to_string(),
            "max_upload_bytes" => self.max_upload_bytes.to_string(),
            "credential_ttl_secs" => self.credential_ttl_secs.to_string(),
            "ffprobe_path" => self.ffprobe_path.clone(),
            "verbose" => self.verbose.to_string(),
            _ => return Err(CliError::config(format!("Unknown config key: {}", key))),
        };
        Ok(value)
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn set_server_url(&mut self, url: String) {
        self.server_url = url;
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn credential_ttl(&self) -> Duration {
        Duration::from_secs(self.credential_ttl_secs)
    }
}

fn env_u64(var: &str) -> Result<Option<u64>> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CliError::config(format!("{} must be a whole number, got '{}'", var, raw))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.api_prefix, "/api/v1");
        assert_eq!(config.max_upload_bytes, 524_288_000);
        assert_eq!(config.credential_ttl(), Duration::from_secs(900));
        assert!(!config.verbose);
    }

    #[test]
    fn test_config_from_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "server_url = \"https://courses.example.com\"\nmax_upload_bytes = 1024\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.server_url(), "https://courses.example.com");
        assert_eq!(config.max_upload_bytes, 1024);
        assert_eq!(config.api_timeout_secs, DEFAULT_API_TIMEOUT_SECS);
    }

    #[test]
    fn test_config_from_file_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_upload_bytes = \"lots\"").unwrap();
        assert!(matches!(Config::from_file(&path), Err(CliError::TomlParse(_))));
    }

    #[test]
    fn test_config_env_overrides() {
        std::env::set_var("LECTERN_API_PREFIX", "/v2");
        std::env::set_var("LECTERN_CREDENTIAL_TTL_SECS", "60");

        let config = Config::from_env().unwrap();
        assert_eq!(config.api_prefix, "/v2");
        assert_eq!(config.credential_ttl_secs, 60);

        std::env::set_var("LECTERN_CREDENTIAL_TTL_SECS", "soon");
        assert!(matches!(Config::from_env(), Err(CliError::Config(_))));

        std::env::remove_var("LECTERN_API_PREFIX");
        std::env::remove_var("LECTERN_CREDENTIAL_TTL_SECS");
    }

    #[test]
    fn test_config_get() {
        let mut config = Config::default();
        config.set_verbose(true);
        assert_eq!(config.get("verbose").unwrap(), "true");
        assert_eq!(config.get("ffprobe_path").unwrap(), "ffprobe");
        assert!(config.get("cache_dir").is_err());
    }
}
