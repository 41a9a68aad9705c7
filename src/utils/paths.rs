//! Cross-Platform Path Utilities
//!
//! Functions for resolving the scanlens directory (~/.scanlens/).

use std::path::{Path, PathBuf};

use scanlens_core::{CoreError, CoreResult};

/// Get the user's home directory
pub fn home_dir() -> CoreResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| CoreError::config("Could not determine home directory"))
}

/// Get the scanlens directory (~/.scanlens/)
pub fn scanlens_dir() -> CoreResult<PathBuf> {
    Ok(home_dir()?.join(".scanlens"))
}

/// Get the config file path (~/.scanlens/config.json)
pub fn config_path() -> CoreResult<PathBuf> {
    Ok(scanlens_dir()?.join("config.json"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> CoreResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
