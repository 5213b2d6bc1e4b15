use anyhow::{Context, Result};
use repokit::RetryConfig;
use repokit::backend::github::DEFAULT_API_BASE;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Optional settings from `<config dir>/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// GitHub API base URL (enterprise hosts)
    pub api_base: String,

    /// Retry policy for remote calls
    pub retry: RetrySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            retry: RetrySettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

impl RetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

impl Settings {
    /// Load settings from the config directory, or defaults if there's no file.
    pub fn load() -> Result<Self> {
        Self::load_from(&crate::paths::settings_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Invalid TOML format in {}", path.display()))
    }
}
