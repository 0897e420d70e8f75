//! Centralized path resolution for novagg
//!
//! # Environment Variables
//!
//! - `NOVAGG_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/novagg`)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `NOVAGG_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/novagg` (if set)
//! 3. `~/.config/novagg`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "NOVAGG_CONFIG_DIR";

/// Manifest file name inside the config directory
pub const MANIFEST_FILE: &str = "aggregates.toml";

/// Get the novagg config directory path
pub fn config_dir() -> Result<PathBuf> {
    config_dir_with(|key| std::env::var(key).ok())
}

fn config_dir_with(lookup: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    // 1. Check environment variable override
    if let Some(dir) = lookup(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    // 2. Check XDG_CONFIG_HOME
    if let Some(xdg_config) = lookup("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("novagg");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    // 3. Default: ~/.config/novagg
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("novagg");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Default manifest location
pub fn default_manifest() -> Result<PathBuf> {
    Ok(config_dir()?.join(MANIFEST_FILE))
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
