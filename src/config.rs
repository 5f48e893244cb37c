//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.indexer.toml` files. Every value has a built-in default, so the
//! indexer runs without any file present.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".indexer.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Outbound HTTP settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Fan-out settings.
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Provider endpoints.
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// Outbound HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("identity-indexer/{}", env!("CARGO_PKG_VERSION"))
}

/// Settings for one aggregation call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Overall deadline in seconds. Lookups still running when it passes
    /// are canceled and reported as failed.
    #[serde(default)]
    pub deadline_seconds: Option<u64>,
}

/// Endpoint templates. `{address}` is replaced with the looked-up address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_context_url")]
    pub context_url: String,

    #[serde(default = "default_superrare_url")]
    pub superrare_url: String,

    /// Foundation subgraph. Queried with POST, no address in the URL.
    #[serde(default = "default_foundation_url")]
    pub foundation_url: String,

    #[serde(default = "default_rarible_followings_url")]
    pub rarible_followings_url: String,

    #[serde(default = "default_rarible_followers_url")]
    pub rarible_followers_url: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            context_url: default_context_url(),
            superrare_url: default_superrare_url(),
            foundation_url: default_foundation_url(),
            rarible_followings_url: default_rarible_followings_url(),
            rarible_followers_url: default_rarible_followers_url(),
        }
    }
}

fn default_context_url() -> String {
    "https://context.app/api/profile/{address}".to_string()
}

fn default_superrare_url() -> String {
    "https://superrare.com/api/v2/user?address={address}".to_string()
}

fn default_foundation_url() -> String {
    "https://api.thegraph.com/subgraphs/name/f8n/fnd".to_string()
}

fn default_rarible_followings_url() -> String {
    "https://api-mainnet.rarible.com/marketplace/api/v4/followings?owner={address}".to_string()
}

fn default_rarible_followers_url() -> String {
    "https://api-mainnet.rarible.com/marketplace/api/v4/followers?user={address}".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given explicitly on the command line override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(timeout) = args.timeout {
            self.http.timeout_seconds = timeout;
        }

        if let Some(deadline) = args.deadline {
            self.aggregation.deadline_seconds = Some(deadline);
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
