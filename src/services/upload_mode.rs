//! Upload Mode Controller
//!
//! Owns the current submission mode and the "open a past result" flow, which
//! adopts whatever mode produced that result.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use scanlens_client::ScanBackend;
use scanlens_core::{CoreResult, RawScanResult};

use crate::models::upload_mode::UploadMode;

/// A stored result opened from history.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalSelection {
    pub uuid: String,
    pub filename: String,
    /// The mode implied by `result`; now also the controller's mode
    pub mode: UploadMode,
    pub result: RawScanResult,
}

/// Current upload mode plus history selection. Clones share the same mode.
#[derive(Clone)]
pub struct UploadModeController {
    backend: Arc<dyn ScanBackend>,
    mode: Arc<RwLock<UploadMode>>,
}

impl UploadModeController {
    pub fn new(backend: Arc<dyn ScanBackend>, initial: UploadMode) -> Self {
        Self {
            backend,
            mode: Arc::new(RwLock::new(initial)),
        }
    }

    pub async fn mode(&self) -> UploadMode {
        *self.mode.read().await
    }

    /// Switch modes. Never touches the network or the displayed result.
    pub async fn set_mode(&self, mode: UploadMode) {
        let mut guard = self.mode.write().await;
        if *guard != mode {
            info!("[UploadMode] {} -> {}", *guard, mode);
        }
        *guard = mode;
    }

    /// Fetch a stored result and switch to the mode that produced it.
    ///
    /// Fails with `NotFound` when nothing is stored for `uuid`; the mode is
    /// left unchanged on failure.
    pub async fn select_historical(
        &self,
        uuid: &str,
        filename: &str,
    ) -> CoreResult<HistoricalSelection> {
        let result = self.backend.fetch_by_uuid(uuid).await?;
        let mode = UploadMode::implied_by(&result);
        self.set_mode(mode).await;
        info!(
            "[UploadMode] Selected {} ({}) as {}",
            filename,
            uuid,
            result.kind().wire_name()
        );

        Ok(HistoricalSelection {
            uuid: uuid.to_string(),
            filename: filename.to_string(),
            mode,
            result,
        })
    }
}
