//! Upload Mode
//!
//! How a file is submitted to the scanning service.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use scanlens_core::{RawScanResult, ResultKind};

/// Submission mode.
///
/// `HashLookup` queries by content hash and returns a single-lookup result;
/// `Full` uploads the file for a multi-engine analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UploadMode {
    #[serde(rename = "quick", alias = "hash_lookup")]
    HashLookup,
    #[default]
    #[serde(rename = "full")]
    Full,
}

impl UploadMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadMode::HashLookup => "quick",
            UploadMode::Full => "full",
        }
    }

    /// The mode that produces results of `kind`.
    pub fn for_kind(kind: ResultKind) -> Self {
        match kind {
            ResultKind::SingleLookup => UploadMode::HashLookup,
            ResultKind::MultiEngineAnalysis => UploadMode::Full,
        }
    }

    /// The mode implied by a stored result's shape.
    pub fn implied_by(result: &RawScanResult) -> Self {
        Self::for_kind(result.kind())
    }
}

impl fmt::Display for UploadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploadMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quick" | "hash" | "hash_lookup" | "lookup" => Ok(UploadMode::HashLookup),
            "full" => Ok(UploadMode::Full),
            other => Err(format!("Unknown upload mode: {}", other)),
        }
    }
}
