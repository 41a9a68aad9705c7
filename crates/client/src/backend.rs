//! Scan Backend Trait
//!
//! Defines the common interface to the remote scanning service.

use async_trait::async_trait;

use scanlens_core::{AnalysisObject, CoreError, CoreResult, RawScanResult};

use crate::types::{FileUpload, FramePayloadStream, FullScanSubmission, HashLookupOutcome};

/// Trait that every scanning-service transport implements.
///
/// Provides a unified interface for:
/// - Submitting files (hash lookup or full scan)
/// - Fetching analyses and previously stored results
/// - Requesting AI summaries, blocking or streamed
#[async_trait]
pub trait ScanBackend: Send + Sync {
    /// Returns the backend name for logging and identification.
    fn name(&self) -> &'static str;

    /// Look the file up by its content hash. A miss is
    /// `HashLookupOutcome::NotFoundInDatabase`, not an error.
    async fn submit_hash_lookup(&self, file: &FileUpload) -> CoreResult<HashLookupOutcome>;

    /// Submit the file for a fresh multi-engine analysis.
    async fn submit_full_scan(&self, file: &FileUpload) -> CoreResult<FullScanSubmission>;

    /// Fetch the current state of the analysis tracked under `uuid`.
    async fn fetch_analysis(&self, uuid: &str) -> CoreResult<AnalysisObject>;

    /// Fetch whichever result shape is stored for `uuid`.
    ///
    /// Returns `CoreError::NotFound` when upstream holds nothing.
    async fn fetch_by_uuid(&self, uuid: &str) -> CoreResult<RawScanResult>;

    /// Generate a summary and wait for the final text.
    async fn request_summary(&self, uuid: &str) -> CoreResult<String>;

    /// Open a server-push summary stream. Each item is one frame payload,
    /// in receipt order.
    async fn open_summary_stream(&self, uuid: &str) -> CoreResult<FramePayloadStream>;
}

/// Map a failed HTTP status to the error taxonomy.
///
/// The service reports failures as `{"detail": "..."}`; the detail is used as
/// the message when present.
pub fn parse_http_error(status: u16, body: &str) -> CoreError {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").map(|d| match d.as_str() {
            Some(s) => s.to_string(),
            None => d.to_string(),
        }))
        .unwrap_or_else(|| body.trim().to_string());

    match status {
        404 => CoreError::not_found(detail),
        400 | 413 | 422 => CoreError::validation(detail),
        _ => CoreError::network(format!("HTTP {}: {}", status, detail)),
    }
}

/// Convert a transport failure into a network error.
pub fn network_error(err: reqwest::Error) -> CoreError {
    if err.is_decode() {
        CoreError::protocol(err.to_string())
    } else {
        CoreError::network(err.to_string())
    }
}
