//! Backend Types
//!
//! Request and response shapes exchanged with the scanning service.

use bytes::Bytes;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

use scanlens_core::{AnalysisObject, CoreError, CoreResult, FileObject};

/// A file selected for submission.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub filename: String,
    pub bytes: Bytes,
    /// Archive password forwarded with full scans
    pub password: Option<String>,
}

impl FileUpload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
            password: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Response wrapper used by every endpoint: `{status, result, message?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub status: u16,
    #[serde(default = "Option::default")]
    pub result: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// The payload, or a protocol error naming what was expected.
    pub fn into_result(self, what: &str) -> CoreResult<T> {
        self.result
            .ok_or_else(|| CoreError::protocol(format!("{} response carried no result", what)))
    }
}

/// A hash lookup hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashLookupReport {
    pub uuid: String,
    pub filename: String,
    /// Served from the service's own result cache rather than a fresh lookup
    #[serde(rename = "found", default)]
    pub cached: bool,
    pub result: FileObject,
}

/// Outcome of a hash lookup. Not-found is a successful outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum HashLookupOutcome {
    Found(HashLookupReport),
    NotFoundInDatabase { message: Option<String> },
}

/// Acknowledgement of a full-scan submission.
#[derive(Debug, Clone, PartialEq)]
pub struct FullScanSubmission {
    pub uuid: String,
    pub filename: String,
    /// Upstream already held a completed analysis for this content
    pub found: bool,
    /// Present when `found`
    pub result: Option<AnalysisObject>,
    /// Identifier of the newly queued analysis when not `found`
    pub analysis_id: Option<String>,
}

impl FullScanSubmission {
    /// The prior analysis to adopt without polling, if upstream reported one.
    pub fn cached_analysis(&self) -> Option<&AnalysisObject> {
        if self.found {
            self.result.as_ref()
        } else {
            None
        }
    }
}

/// Ordered frame payloads of one summary stream. Dropping the stream closes
/// the underlying transport.
pub type FramePayloadStream = BoxStream<'static, CoreResult<String>>;
