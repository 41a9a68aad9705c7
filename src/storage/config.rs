//! JSON Configuration Management
//!
//! Handles reading and writing the scanner configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use scanlens_core::{CoreError, CoreResult};

use crate::models::settings::{ScannerConfig, SettingsUpdate};
use crate::utils::paths::{config_path, ensure_dir};

/// Configuration service for managing scanner settings
#[derive(Debug)]
pub struct ConfigService {
    config_path: PathBuf,
    config: ScannerConfig,
}

impl ConfigService {
    /// Load ~/.scanlens/config.json, creating it with defaults if missing.
    /// `SCANLENS_API_URL` is applied on top.
    pub fn new() -> CoreResult<Self> {
        let mut service = Self::load_from(config_path()?)?;
        service.config.apply_env_override();
        Ok(service)
    }

    /// Load from an explicit path, creating the file with defaults if missing.
    pub fn load_from(path: impl Into<PathBuf>) -> CoreResult<Self> {
        let config_path = path.into();
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                ensure_dir(parent)?;
            }
        }

        let config = if config_path.exists() {
            debug!("[Config] Loading {}", config_path.display());
            Self::load_from_file(&config_path)?
        } else {
            info!("[Config] Creating default config at {}", config_path.display());
            let default_config = ScannerConfig::default();
            Self::save_to_file(&config_path, &default_config)?;
            default_config
        };

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> CoreResult<ScannerConfig> {
        let content = fs::read_to_string(path)?;
        let config: ScannerConfig = serde_json::from_str(&content)?;
        config.validate().map_err(CoreError::validation)?;
        Ok(config)
    }

    /// Save configuration to a file with pretty formatting
    fn save_to_file(path: &Path, config: &ScannerConfig) -> CoreResult<()> {
        config.validate().map_err(CoreError::validation)?;
        let content = serde_json::to_string_pretty(config)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Get a clone of the current configuration
    pub fn get_config_clone(&self) -> ScannerConfig {
        self.config.clone()
    }

    /// Update the configuration with a partial update.
    ///
    /// An update that fails validation leaves the stored config untouched.
    pub fn update_config(&mut self, update: SettingsUpdate) -> CoreResult<ScannerConfig> {
        let mut candidate = self.config.clone();
        candidate.apply_update(update);
        Self::save_to_file(&self.config_path, &candidate)?;
        self.config = candidate;
        Ok(self.config.clone())
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> CoreResult<()> {
        Self::save_to_file(&self.config_path, &self.config)
    }

    /// Reload configuration from disk
    pub fn reload(&mut self) -> CoreResult<()> {
        self.config = Self::load_from_file(&self.config_path)?;
        Ok(())
    }

    /// Reset configuration to defaults
    pub fn reset(&mut self) -> CoreResult<()> {
        self.config = ScannerConfig::default();
        self.save()?;
        Ok(())
    }

    /// Check if the config service is healthy
    pub fn is_healthy(&self) -> bool {
        self.config_path.exists() && self.config.validate().is_ok()
    }
}
