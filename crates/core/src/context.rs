//! Threat Context Builder
//!
//! Normalizes either raw result shape into a single display/decision context.
//! Building is pure: the input is only read, and building twice from the same
//! input yields equal values, so callers may rebuild on every render instead
//! of caching.

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::result::{
    AnalysisObject, AnalysisStatus, CommunityVotes, EngineCategory, FileObject, RawScanResult,
};
use crate::tally::{DetectionTally, ThreatAssessment, ThreatLevel};

/// Display name used when neither upstream nor the caller knows the file name.
pub const UNKNOWN_FILE_NAME: &str = "Unknown file";

/// Normalized view of a [`RawScanResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThreatContext {
    File(FileContext),
    Analysis(AnalysisContext),
}

impl ThreatContext {
    /// Build the context for a typed result.
    pub fn derive(raw: &RawScanResult, filename: Option<&str>) -> Self {
        match raw {
            RawScanResult::SingleLookup(file) => ThreatContext::File(build_file_context(file, filename)),
            RawScanResult::MultiEngineAnalysis(analysis) => {
                ThreatContext::Analysis(build_analysis_context(analysis, filename))
            }
        }
    }

    /// Build the context from dynamic JSON. An unrecognized discriminant fails
    /// with `UnknownResultType`; no partial context is returned.
    pub fn derive_value(value: &serde_json::Value, filename: Option<&str>) -> CoreResult<Self> {
        let raw = RawScanResult::from_value(value.clone())?;
        Ok(Self::derive(&raw, filename))
    }

    pub fn detections(&self) -> &Detections {
        match self {
            ThreatContext::File(file) => &file.detections,
            ThreatContext::Analysis(analysis) => &analysis.detections,
        }
    }

    pub fn tally(&self) -> &DetectionTally {
        &self.detections().engines
    }

    pub fn assessment(&self) -> ThreatAssessment {
        let detections = self.detections();
        ThreatAssessment {
            percentage: detections.threat_percentage,
            level: detections.threat_level,
        }
    }

    /// Lookups are final; analyses once completed.
    pub fn is_complete(&self) -> bool {
        match self {
            ThreatContext::File(_) => true,
            ThreatContext::Analysis(analysis) => analysis.status.state == AnalysisStatus::Completed,
        }
    }
}

/// Engine counts plus the assessment derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detections {
    pub engines: DetectionTally,
    pub threat_percentage: u8,
    pub threat_level: ThreatLevel,
}

impl Detections {
    fn from_tally(engines: DetectionTally) -> Self {
        let assessment = engines.assessment();
        Self {
            engines,
            threat_percentage: assessment.percentage,
            threat_level: assessment.level,
        }
    }
}

// ============================================================================
// File (hash lookup) context
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileContext {
    pub identity: FileIdentity,
    pub hashes: FileHashes,
    pub reputation: Reputation,
    pub submissions: Submissions,
    pub timeline: Timeline,
    pub detections: Detections,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threat_severity: Option<SeverityContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threat_verdict: Option<String>,
    pub tags: Vec<String>,
    pub type_tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox_verdicts: Option<Vec<SandboxEntry>>,
    pub known_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileIdentity {
    /// Best available display name.
    pub filename: String,
    pub meaningful_name: Option<String>,
    pub type_description: Option<String>,
    pub extension: Option<String>,
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileHashes {
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub sha256: Option<String>,
    pub tlsh: Option<String>,
    pub vhash: Option<String>,
    pub permhash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reputation {
    pub score: i64,
    pub community_votes: Option<CommunityVotes>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submissions {
    pub times_submitted: Option<u32>,
    pub unique_sources: Option<u32>,
}

/// Unix-second timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub creation_date: Option<i64>,
    pub first_submission_date: Option<i64>,
    pub last_submission_date: Option<i64>,
    pub last_analysis_date: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityContext {
    pub level: Option<String>,
    pub description: Option<String>,
    pub indicators: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxEntry {
    pub engine: String,
    pub category: String,
    pub sandbox_name: Option<String>,
    pub confidence: Option<u32>,
}

fn build_file_context(file: &FileObject, filename: Option<&str>) -> FileContext {
    let a = &file.attributes;
    let stats = a.last_analysis_stats.unwrap_or_default();

    let display_name = a
        .meaningful_name
        .clone()
        .or_else(|| a.names.as_ref().and_then(|names| names.first().cloned()))
        .or_else(|| filename.map(str::to_string))
        .unwrap_or_else(|| UNKNOWN_FILE_NAME.to_string());

    FileContext {
        identity: FileIdentity {
            filename: display_name,
            meaningful_name: a.meaningful_name.clone(),
            type_description: a.type_description.clone().or_else(|| a.type_tag.clone()),
            extension: a.type_extension.clone(),
            size_bytes: a.size,
        },
        hashes: FileHashes {
            md5: a.md5.clone(),
            sha1: a.sha1.clone(),
            sha256: a.sha256.clone(),
            tlsh: a.tlsh.clone(),
            vhash: a.vhash.clone(),
            permhash: a.permhash.clone(),
        },
        reputation: Reputation {
            score: a.reputation.unwrap_or(0),
            community_votes: a.total_votes,
        },
        submissions: Submissions {
            times_submitted: a.times_submitted,
            unique_sources: a.unique_sources,
        },
        timeline: Timeline {
            creation_date: a.creation_date,
            first_submission_date: a.first_submission_date,
            last_submission_date: a.last_submission_date,
            last_analysis_date: a.last_analysis_date,
        },
        detections: Detections::from_tally(DetectionTally::for_lookup(&stats)),
        threat_severity: a.threat_severity.as_ref().map(|severity| SeverityContext {
            level: severity.threat_severity_level.clone(),
            description: severity.level_description.clone(),
            indicators: severity.threat_severity_data.clone(),
        }),
        threat_verdict: a.threat_verdict.clone(),
        tags: a.tags.clone().unwrap_or_default(),
        type_tags: a.type_tags.clone().unwrap_or_default(),
        sandbox_verdicts: a.sandbox_verdicts.as_ref().map(|verdicts| {
            verdicts
                .iter()
                .map(|(engine, verdict)| SandboxEntry {
                    engine: engine.to_string(),
                    category: verdict.category.clone(),
                    sandbox_name: verdict.sandbox_name.clone(),
                    confidence: verdict.confidence,
                })
                .collect()
        }),
        known_names: a.names.clone().unwrap_or_default(),
    }
}

// ============================================================================
// Analysis (full scan) context
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContext {
    pub identity: AnalysisIdentity,
    pub status: AnalysisState,
    pub detections: Detections,
    pub flagged_engines: Vec<FlaggedEngine>,
    pub timeouts: TimeoutCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisIdentity {
    pub id: String,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisState {
    pub state: AnalysisStatus,
    /// Unix seconds
    pub scan_date: i64,
}

/// An engine that reported malicious or suspicious.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedEngine {
    pub engine: String,
    pub category: EngineCategory,
    pub method: Option<String>,
    pub result: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutCounts {
    pub timeout: u32,
    pub confirmed_timeout: u32,
}

fn build_analysis_context(analysis: &AnalysisObject, filename: Option<&str>) -> AnalysisContext {
    let attrs = &analysis.attributes;
    let engines = DetectionTally::for_analysis(&attrs.stats);

    let flagged_engines = attrs
        .results
        .iter()
        .filter(|(_, verdict)| verdict.category.is_flagged())
        .map(|(key, verdict)| FlaggedEngine {
            engine: if verdict.engine_name.is_empty() {
                key.to_string()
            } else {
                verdict.engine_name.clone()
            },
            category: verdict.category.clone(),
            method: verdict.method.clone(),
            result: verdict.result.clone(),
        })
        .collect();

    AnalysisContext {
        identity: AnalysisIdentity {
            id: analysis.id.clone(),
            filename: filename.map(str::to_string),
        },
        status: AnalysisState {
            state: attrs.status,
            scan_date: attrs.date,
        },
        timeouts: TimeoutCounts {
            timeout: engines.timeouts,
            confirmed_timeout: engines.confirmed_timeouts,
        },
        detections: Detections::from_tally(engines),
        flagged_engines,
    }
}
