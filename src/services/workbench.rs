//! Scan Workbench
//!
//! Top-level flow tying the controllers together: upload in the current mode,
//! open past results, refresh analyses, and summarise. Owns the "current
//! result"; the most recent write wins.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use scanlens_client::{FileUpload, HashLookupOutcome, HttpScanBackend, ScanBackend};
use scanlens_core::{CoreError, CoreResult, RawScanResult, ThreatContext};

use crate::models::history::FileHistoryEntry;
use crate::models::settings::ScannerConfig;
use crate::models::upload_mode::UploadMode;
use crate::services::analysis::{AnalysisLifecycleController, AnalysisSnapshot};
use crate::services::summary::SummaryStreamClient;
use crate::services::upload_mode::UploadModeController;
use crate::storage::history::ScanHistoryStore;
use crate::storage::summary_cache::SummaryCache;

/// Message for a hash lookup miss when the service sends none.
pub const NOT_IN_DATABASE_MESSAGE: &str =
    "File not found in the scanning database. Try a full scan instead.";

/// The result currently on display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentResult {
    pub uuid: String,
    pub filename: String,
    pub result: RawScanResult,
}

impl CurrentResult {
    pub fn context(&self) -> ThreatContext {
        ThreatContext::derive(&self.result, Some(&self.filename))
    }
}

/// Outcome of [`ScanWorkbench::upload`].
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// A result is now current (possibly a still-pending analysis)
    Scanned(CurrentResult),
    /// Hash lookup miss; nothing changed
    NotFoundInDatabase { message: String },
}

pub struct ScanWorkbench {
    backend: Arc<dyn ScanBackend>,
    modes: UploadModeController,
    lifecycle: AnalysisLifecycleController,
    summaries: SummaryStreamClient,
    history: RwLock<ScanHistoryStore>,
    current: RwLock<Option<CurrentResult>>,
    max_upload_bytes: u64,
}

impl ScanWorkbench {
    pub fn new(backend: Arc<dyn ScanBackend>, config: &ScannerConfig) -> Self {
        let modes = UploadModeController::new(Arc::clone(&backend), config.default_upload_mode);
        let lifecycle = AnalysisLifecycleController::new(Arc::clone(&backend), modes.clone());
        let summaries = SummaryStreamClient::new(Arc::clone(&backend), SummaryCache::new());
        Self {
            backend,
            modes,
            lifecycle,
            summaries,
            history: RwLock::new(ScanHistoryStore::new()),
            current: RwLock::new(None),
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    /// Build over the HTTP backend described by `config`.
    pub fn from_config(config: &ScannerConfig) -> CoreResult<Self> {
        config.validate().map_err(CoreError::config)?;
        let backend = HttpScanBackend::new(config.client_options())?;
        Ok(Self::new(Arc::new(backend), config))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Submit `file` in the current mode.
    pub async fn upload(&self, file: FileUpload) -> CoreResult<UploadOutcome> {
        if file.len() as u64 > self.max_upload_bytes {
            return Err(CoreError::validation(format!(
                "{} is {} bytes; the limit is {} bytes",
                file.filename,
                file.len(),
                self.max_upload_bytes
            )));
        }

        let mode = self.modes.mode().await;
        info!("[Workbench] Uploading {} in {} mode", file.filename, mode);

        let current = match mode {
            UploadMode::HashLookup => match self.backend.submit_hash_lookup(&file).await? {
                HashLookupOutcome::Found(report) => CurrentResult {
                    uuid: report.uuid,
                    filename: report.filename,
                    result: RawScanResult::SingleLookup(report.result),
                },
                HashLookupOutcome::NotFoundInDatabase { message } => {
                    debug!("[Workbench] {} not in database", file.filename);
                    return Ok(UploadOutcome::NotFoundInDatabase {
                        message: message
                            .filter(|m| !m.is_empty())
                            .unwrap_or_else(|| NOT_IN_DATABASE_MESSAGE.to_string()),
                    });
                }
            },
            UploadMode::Full => {
                let snapshot = self.lifecycle.submit(&file).await?;
                current_from_snapshot(snapshot)?
            }
        };

        self.history
            .write()
            .await
            .record(FileHistoryEntry::new(&current.uuid, &current.filename, mode));
        *self.current.write().await = Some(current.clone());
        Ok(UploadOutcome::Scanned(current))
    }

    /// Open a past result, adopting the mode that produced it.
    pub async fn select_historical(&self, uuid: &str, filename: &str) -> CoreResult<CurrentResult> {
        let selection = self.modes.select_historical(uuid, filename).await?;

        match selection.result.as_analysis() {
            Some(analysis) => {
                self.lifecycle
                    .track(&selection.uuid, &selection.filename, Some(analysis.clone()))
                    .await
            }
            None => self.lifecycle.clear().await,
        }

        self.history.write().await.record(FileHistoryEntry::new(
            &selection.uuid,
            &selection.filename,
            selection.mode,
        ));

        let current = CurrentResult {
            uuid: selection.uuid,
            filename: selection.filename,
            result: selection.result,
        };
        *self.current.write().await = Some(current.clone());
        Ok(current)
    }

    /// Refresh the tracked analysis and make it current.
    pub async fn refresh_analysis(&self) -> CoreResult<CurrentResult> {
        let snapshot = self.lifecycle.refresh().await?;
        let current = current_from_snapshot(snapshot)?;

        let mut guard = self.current.write().await;
        if guard.as_ref().map_or(true, |c| c.uuid == current.uuid) {
            *guard = Some(current.clone());
        }
        Ok(current)
    }

    pub async fn current(&self) -> Option<CurrentResult> {
        self.current.read().await.clone()
    }

    /// Threat context of the current result, derived on each call.
    pub async fn context(&self) -> Option<ThreatContext> {
        self.current.read().await.as_ref().map(CurrentResult::context)
    }

    pub async fn history(&self) -> Vec<FileHistoryEntry> {
        self.history.read().await.list().to_vec()
    }

    pub async fn mode(&self) -> UploadMode {
        self.modes.mode().await
    }

    pub async fn set_mode(&self, mode: UploadMode) {
        self.modes.set_mode(mode).await
    }

    pub async fn analysis(&self) -> AnalysisSnapshot {
        self.lifecycle.snapshot().await
    }

    pub fn summaries(&self) -> &SummaryStreamClient {
        &self.summaries
    }
}

fn current_from_snapshot(snapshot: AnalysisSnapshot) -> CoreResult<CurrentResult> {
    match (snapshot.uuid, snapshot.analysis) {
        (Some(uuid), Some(analysis)) => Ok(CurrentResult {
            uuid,
            filename: snapshot.filename.unwrap_or_default(),
            result: RawScanResult::MultiEngineAnalysis(analysis),
        }),
        _ => Err(CoreError::internal("analysis snapshot carried no result")),
    }
}
