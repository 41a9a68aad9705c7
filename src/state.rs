//! Application State
//!
//! Process-wide state holding the config service and the scan workbench.

use std::sync::Arc;
use tokio::sync::RwLock;

use scanlens_core::{CoreError, CoreResult};

use crate::models::settings::{ScannerConfig, SettingsUpdate};
use crate::services::workbench::ScanWorkbench;
use crate::storage::ConfigService;

/// Application state shared by the front end
pub struct AppState {
    /// Configuration service for scanner settings
    config: Arc<RwLock<Option<ConfigService>>>,
    /// Workbench built from the loaded config
    workbench: Arc<RwLock<Option<Arc<ScanWorkbench>>>>,
    /// Whether the state has been initialized
    initialized: Arc<RwLock<bool>>,
}

impl AppState {
    /// Create a new uninitialized app state
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(None)),
            workbench: Arc::new(RwLock::new(None)),
            initialized: Arc::new(RwLock::new(false)),
        }
    }

    /// Initialize from ~/.scanlens/config.json
    pub async fn initialize(&self) -> CoreResult<()> {
        if *self.initialized.read().await {
            return Ok(());
        }
        self.initialize_with(ConfigService::new()?).await
    }

    /// Initialize from an already-loaded config service
    pub async fn initialize_with(&self, config: ConfigService) -> CoreResult<()> {
        let mut initialized = self.initialized.write().await;
        if *initialized {
            return Ok(());
        }

        let workbench = ScanWorkbench::from_config(config.get_config())?;
        *self.workbench.write().await = Some(Arc::new(workbench));
        *self.config.write().await = Some(config);

        *initialized = true;
        Ok(())
    }

    /// Check if config is healthy
    pub fn is_config_healthy(&self) -> bool {
        if let Ok(guard) = self.config.try_read() {
            if let Some(ref config) = *guard {
                return config.is_healthy();
            }
        }
        false
    }

    /// Get the current configuration
    pub async fn get_config(&self) -> CoreResult<ScannerConfig> {
        let guard = self.config.read().await;
        match &*guard {
            Some(config) => Ok(config.get_config_clone()),
            None => Err(CoreError::config("Config service not initialized")),
        }
    }

    /// Update the configuration. Takes effect for the workbench on the next
    /// [`AppState::rebuild_workbench`].
    pub async fn update_config(&self, update: SettingsUpdate) -> CoreResult<ScannerConfig> {
        let mut guard = self.config.write().await;
        match &mut *guard {
            Some(config) => config.update_config(update),
            None => Err(CoreError::config("Config service not initialized")),
        }
    }

    /// Replace the workbench with one built from the current config.
    /// History and cached summaries of the old workbench are dropped.
    pub async fn rebuild_workbench(&self) -> CoreResult<Arc<ScanWorkbench>> {
        let config = self.get_config().await?;
        let workbench = Arc::new(ScanWorkbench::from_config(&config)?);
        *self.workbench.write().await = Some(Arc::clone(&workbench));
        Ok(workbench)
    }

    /// Get the workbench
    pub async fn workbench(&self) -> CoreResult<Arc<ScanWorkbench>> {
        let guard = self.workbench.read().await;
        match &*guard {
            Some(workbench) => Ok(Arc::clone(workbench)),
            None => Err(CoreError::state("Workbench not initialized")),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
