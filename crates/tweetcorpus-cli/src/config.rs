//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tweetcorpus_core::LoopOptions;
use tweetcorpus_twitter::Credentials;

/// Global configuration for tweetcorpus
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub twitter: TwitterConfig,
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub corpus: PathBuf,
    pub output: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            corpus: PathBuf::from("data/corpus.csv"),
            output: PathBuf::from("data/tweets.csv"),
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TwitterConfig {
    pub api_url: String,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub bearer_token: Option<String>,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub consumer_key: Option<String>,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub consumer_secret: Option<String>,
    pub timeout_secs: u64,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.twitter.com/".to_string(),
            bearer_token: std::env::var("TWITTER_BEARER_TOKEN").ok(),
            consumer_key: std::env::var("TWITTER_CONSUMER_KEY").ok(),
            consumer_secret: std::env::var("TWITTER_CONSUMER_SECRET").ok(),
            timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for TwitterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterConfig")
            .field("api_url", &self.api_url)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| ".."))
            .field("consumer_key", &self.consumer_key.as_ref().map(|_| ".."))
            .field("consumer_secret", &self.consumer_secret.as_ref().map(|_| ".."))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl TwitterConfig {
    /// Credentials for the client: bearer token first, then consumer pair.
    pub fn credentials(&self) -> Result<Credentials> {
        Credentials::resolve(
            self.bearer_token.as_deref(),
            self.consumer_key.as_deref(),
            self.consumer_secret.as_deref(),
        )
        .context(
            "No Twitter credentials: set TWITTER_BEARER_TOKEN, or TWITTER_CONSUMER_KEY \
             and TWITTER_CONSUMER_SECRET (or the [twitter] section of the config file)",
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Authentication mode for display; never the secret itself
    pub fn auth_mode(&self) -> &'static str {
        match self.credentials() {
            Ok(Credentials::Bearer(_)) => "bearer token",
            Ok(Credentials::Consumer { .. }) => "consumer key/secret",
            Err(_) => "not set",
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub progress_interval: usize,
    pub reset_margin_secs: u64,
    pub max_retries: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let defaults = LoopOptions::default();
        Self {
            progress_interval: defaults.progress_interval,
            reset_margin_secs: defaults.reset_margin.as_secs(),
            max_retries: defaults.max_transport_retries,
        }
    }
}

impl From<FetchConfig> for LoopOptions {
    fn from(c: FetchConfig) -> Self {
        Self {
            progress_interval: c.progress_interval,
            reset_margin: Duration::from_secs(c.reset_margin_secs),
            max_transport_retries: c.max_retries,
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./tweetcorpus.toml
    /// 2. platform config dir, e.g. ~/.config/tweetcorpus/config.toml
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("tweetcorpus.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(dirs) = directories::ProjectDirs::from("", "", "tweetcorpus") {
            let user_config = dirs.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
