use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::{
    api::{HttpWeatherApi, RetryPolicy, TokenStore, TransportPolicy, auth::TokenPair},
    controller::DEFAULT_FALLBACK_CITY,
    language::Language,
    model::Coordinates,
};

/// Environment variable that overrides `base_url`.
pub const BASE_URL_ENV: &str = "SKYCAST_API_URL";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// base_url = "http://localhost:8080"
/// language = "pt"
/// fallback_city = "Lisbon"
///
/// [home]
/// lat = 38.72
/// lon = -9.14
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub timeout_secs: u64,
    pub language: Language,
    pub fallback_city: String,
    pub retry: RetryPolicy,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<TokenPair>,

    /// Position used instead of live geolocation for the initial lookup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home: Option<Coordinates>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            language: Language::default(),
            fallback_city: DEFAULT_FALLBACK_CITY.to_string(),
            retry: RetryPolicy::default(),
            auth: None,
            home: None,
        }
    }
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, use defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents)?;
        if cfg.fallback_city.trim().is_empty() {
            return Err(anyhow!("fallback_city must not be empty"));
        }
        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "skycast", "skycast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Gateway URL, honouring [`BASE_URL_ENV`] when it is set and non-empty.
    pub fn effective_base_url(&self) -> String {
        Self::pick_base_url(std::env::var(BASE_URL_ENV).ok(), &self.base_url)
    }

    fn pick_base_url(env: Option<String>, configured: &str) -> String {
        env.filter(|url| !url.trim().is_empty()).unwrap_or_else(|| configured.to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn transport_policy(&self) -> TransportPolicy {
        TransportPolicy { retry: self.retry, refresh_on_unauthorized: true }
    }

    /// Build the gateway client described by this config.
    pub fn build_api(&self) -> Result<HttpWeatherApi> {
        let tokens = TokenStore::new(self.auth.clone().unwrap_or_default());

        HttpWeatherApi::new(
            &self.effective_base_url(),
            self.timeout(),
            self.transport_policy(),
            tokens,
        )
        .context("Failed to build weather service client")
    }
}
