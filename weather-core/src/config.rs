use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::PathBuf, time::Duration};

use crate::provider::ProviderId;

/// Race deadline used when neither the CLI nor the config file sets one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration for a single provider (e.g., API key).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,

    /// Overrides the provider's public endpoint, e.g. for a proxy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Deadline for a whole report request, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Providers raced by default, e.g. ["openweather", "weatherapi"].
    /// Empty means every known provider.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enabled: Vec<String>,

    /// Example TOML:
    /// [providers.openweather]
    /// api_key = "..."
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

impl Config {
    /// Providers to race when the caller does not pick any.
    pub fn enabled_provider_ids(&self) -> Result<Vec<ProviderId>> {
        if self.enabled.is_empty() {
            return Ok(ProviderId::all().to_vec());
        }

        let mut ids = Vec::with_capacity(self.enabled.len());
        for name in &self.enabled {
            let id = ProviderId::try_from(name.as_str())
                .with_context(|| "Invalid entry in `enabled` providers list")?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn provider_config(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.get(id.as_str())
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
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
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set/replace a provider API key, keeping any configured base URL.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers.entry(provider_id.as_str().to_string()).or_default().api_key = api_key;
    }

    /// API key for a provider: the provider's environment variable wins over
    /// the config file. Blank values count as absent.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<String> {
        self.provider_api_key_with(provider_id, |name| std::env::var(name).ok())
    }

    fn provider_api_key_with(
        &self,
        provider_id: ProviderId,
        env: impl Fn(&str) -> Option<String>,
    ) -> Option<String> {
        env(provider_id.api_key_env())
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                self.provider_config(provider_id)
                    .map(|cfg| cfg.api_key.clone())
                    .filter(|key| !key.trim().is_empty())
            })
    }

    pub fn provider_base_url(&self, provider_id: ProviderId) -> Option<String> {
        self.provider_config(provider_id).and_then(|cfg| cfg.base_url.clone())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        self.provider_api_key(provider_id).is_some()
    }
}
