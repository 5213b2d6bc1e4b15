//! Path resolution for wt
//!
//! # Environment Variables
//!
//! - `WT_CONFIG_DIR` - Override config directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `WT_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/wt` (if set)
//! 3. `~/.config/wt`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "WT_CONFIG_DIR";

const APP_DIR: &str = "wt";

/// Get the wt config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_DIR);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join(APP_DIR);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Path of the persisted access token
pub fn token_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("token"))
}

/// Path of the optional settings file
pub fn settings_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}
