//! History Models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::upload_mode::UploadMode;
use crate::utils::formatters::file_extension;

/// One previously scanned file, as shown in the history list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHistoryEntry {
    pub uuid: String,
    pub filename: String,
    pub timestamp: DateTime<Utc>,
    /// Upper-cased extension, or `FILE`
    pub file_type: String,
    pub scan_mode: UploadMode,
}

impl FileHistoryEntry {
    /// Build an entry stamped with the current time.
    pub fn new(uuid: impl Into<String>, filename: impl Into<String>, scan_mode: UploadMode) -> Self {
        Self::at(uuid, filename, scan_mode, Utc::now())
    }

    pub fn at(
        uuid: impl Into<String>,
        filename: impl Into<String>,
        scan_mode: UploadMode,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let filename = filename.into();
        Self {
            uuid: uuid.into(),
            file_type: file_extension(&filename),
            filename,
            timestamp,
            scan_mode,
        }
    }
}
