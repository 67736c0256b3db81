//! Configuration module for the dependency resolver.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file (`~/.bz/settings.toml`)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `BZ_` and use double
//! underscores to separate nested levels:
//! - `BZ_CACHE_ROOT=/tmp/bzcache` sets `cache_root`
//! - `BZ_NETWORK__RETRIES=5` sets `network.retries`
//! - `BZ_NETWORK__TIMEOUT_SECS=10` sets `network.timeout_secs`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Base directory for downloaded and extracted dependency state
    #[serde(default = "default_cache_root")]
    pub cache_root: PathBuf,

    /// Global debug mode
    #[serde(default = "default_false")]
    pub debug: bool,

    /// Per-server settings, keyed by host name (e.g. "github.com")
    #[serde(default)]
    pub server: BTreeMap<String, ServerConfig>,

    /// Network behavior for release lookups and downloads
    #[serde(default)]
    pub network: NetworkConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ServerConfig {
    /// Access token used as a bearer credential against this host.
    /// Absent means anonymous access, subject to provider rate limits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NetworkConfig {
    /// Request timeout in seconds for release lookups and downloads
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for transient network failures (connect errors, 5xx)
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Pause between retries, in milliseconds
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_cache_root() -> PathBuf {
    user_dir().join("cache")
}
fn default_false() -> bool {
    false
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_retries() -> u32 {
    2
}
fn default_backoff_ms() -> u64 {
    500
}

/// The per-user bz directory, `~/.bz`
pub fn user_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".bz")
}

/// Path of the user-level settings file, `~/.bz/settings.toml`
pub fn user_settings_path() -> PathBuf {
    user_dir().join("settings.toml")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            cache_root: default_cache_root(),
            debug: false,
            server: BTreeMap::new(),
            network: NetworkConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources.
    ///
    /// A missing settings file is not an error: defaults apply and remote
    /// access proceeds without tokens.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from(user_settings_path())
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path))
            // Layer in environment variables with BZ_ prefix
            // Double underscore separates nested levels
            .merge(Env::prefixed("BZ_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Save current configuration to file
    pub fn save(
        &self,
        path: impl AsRef<std::path::Path>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Access token for a host, if configured. Host comparison is
    /// case-insensitive (DNS names are).
    pub fn server_token(&self, host: &str) -> Option<&str> {
        self.server.iter().find_map(|(name, attrs)| {
            if name.eq_ignore_ascii_case(host) {
                attrs.token.as_deref()
            } else {
                None
            }
        })
    }

    /// Create a default settings file with helpful comments
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = user_settings_path();

        if !force && config_path.exists() {
            return Err("Settings file already exists. Use --force to overwrite".into());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = format!(
            r#"# bz settings
# https://github.com/bazurto/bz

# Version of the configuration schema
version = 1

# Base directory for downloaded and extracted dependencies
cache_root = "{}"

# Global debug mode
debug = false

[network]
# Request timeout in seconds
timeout_secs = 30

# Retries for transient network failures
retries = 2

# Pause between retries, in milliseconds
backoff_ms = 500

# Per-server access tokens. Anonymous access works but is rate limited.
# [server."github.com"]
# token = "ghp_..."
"#,
            default_cache_root().display()
        );

        std::fs::write(&config_path, template)?;

        Ok(config_path)
    }
}
