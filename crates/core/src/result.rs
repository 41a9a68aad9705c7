//! Raw Scan Results
//!
//! The two result shapes the scanning service returns, modelled as one closed
//! sum type. The wire discriminant is the JSON `type` field:
//! `"file"` for a hash lookup and `"analysis"` for a multi-engine analysis.
//!
//! Every attribute the upstream service may omit is optional; the builder in
//! [`crate::context`] decides what an absent field means.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CoreError, CoreResult};

// ============================================================================
// RawScanResult
// ============================================================================

/// A raw result as returned upstream. A later fetch of the same analysis
/// replaces the whole value; fields are never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RawScanResult {
    /// Instant hash lookup. Final, never changes state.
    #[serde(rename = "file")]
    SingleLookup(FileObject),
    /// Full multi-engine analysis. Evolves from queued to completed.
    #[serde(rename = "analysis")]
    MultiEngineAnalysis(AnalysisObject),
}

/// Discriminant of a [`RawScanResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    SingleLookup,
    MultiEngineAnalysis,
}

impl ResultKind {
    /// The wire discriminant.
    pub fn wire_name(&self) -> &'static str {
        match self {
            ResultKind::SingleLookup => "file",
            ResultKind::MultiEngineAnalysis => "analysis",
        }
    }
}

impl RawScanResult {
    /// Parse a result from dynamic JSON.
    ///
    /// An unrecognized or missing `type` fails with
    /// [`CoreError::UnknownResultType`]; a known type with a malformed body
    /// fails with [`CoreError::Protocol`].
    pub fn from_value(value: serde_json::Value) -> CoreResult<Self> {
        let kind = match value.get("type").and_then(|t| t.as_str()) {
            Some(kind) => kind.to_string(),
            None => return Err(CoreError::UnknownResultType("<missing>".to_string())),
        };

        match kind.as_str() {
            "file" | "analysis" => serde_json::from_value(value).map_err(|e| {
                CoreError::protocol(format!("malformed {} result: {}", kind, e))
            }),
            _ => Err(CoreError::UnknownResultType(kind)),
        }
    }

    pub fn kind(&self) -> ResultKind {
        match self {
            RawScanResult::SingleLookup(_) => ResultKind::SingleLookup,
            RawScanResult::MultiEngineAnalysis(_) => ResultKind::MultiEngineAnalysis,
        }
    }

    /// Upstream identifier (file hash or analysis id).
    pub fn id(&self) -> &str {
        match self {
            RawScanResult::SingleLookup(file) => &file.id,
            RawScanResult::MultiEngineAnalysis(analysis) => &analysis.id,
        }
    }

    /// A lookup is always final; an analysis only once its status is completed.
    pub fn is_complete(&self) -> bool {
        match self {
            RawScanResult::SingleLookup(_) => true,
            RawScanResult::MultiEngineAnalysis(analysis) => analysis.is_completed(),
        }
    }

    pub fn as_analysis(&self) -> Option<&AnalysisObject> {
        match self {
            RawScanResult::MultiEngineAnalysis(analysis) => Some(analysis),
            RawScanResult::SingleLookup(_) => None,
        }
    }
}

impl From<FileObject> for RawScanResult {
    fn from(file: FileObject) -> Self {
        RawScanResult::SingleLookup(file)
    }
}

impl From<AnalysisObject> for RawScanResult {
    fn from(analysis: AnalysisObject) -> Self {
        RawScanResult::MultiEngineAnalysis(analysis)
    }
}

/// Resource links attached to a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultLinks {
    #[serde(rename = "self")]
    pub self_link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
}

// ============================================================================
// Hash lookup shape
// ============================================================================

/// Hash lookup result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileObject {
    pub id: String,
    #[serde(default)]
    pub attributes: FileAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<ResultLinks>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tlsh: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vhash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permhash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_extension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meaningful_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_submission_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_submission_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_analysis_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modification_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_analysis_stats: Option<AnalysisStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_analysis_results: Option<OrderedMap<EngineVerdict>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reputation: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_votes: Option<CommunityVotes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities_tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox_verdicts: Option<OrderedMap<SandboxVerdict>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_sources: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times_submitted: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_verdict: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_severity: Option<ThreatSeverity>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityVotes {
    #[serde(default)]
    pub harmless: u32,
    #[serde(default)]
    pub malicious: u32,
}

/// Dynamic-analysis verdict from one sandbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxVerdict {
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub malware_classification: Option<Vec<String>>,
}

/// Upstream severity enrichment. The level is kept as the raw
/// `SEVERITY_*` string so unseen levels still parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatSeverity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_analysis_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_severity_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_severity_data: Option<serde_json::Value>,
}

// ============================================================================
// Multi-engine analysis shape
// ============================================================================

/// Full-scan analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisObject {
    pub id: String,
    pub attributes: AnalysisAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<ResultLinks>,
}

impl AnalysisObject {
    pub fn status(&self) -> AnalysisStatus {
        self.attributes.status
    }

    pub fn is_completed(&self) -> bool {
        self.attributes.status == AnalysisStatus::Completed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisAttributes {
    /// Unix seconds
    #[serde(default)]
    pub date: i64,
    pub status: AnalysisStatus,
    #[serde(default)]
    pub results: OrderedMap<EngineVerdict>,
    #[serde(default)]
    pub stats: AnalysisStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisStatus {
    Queued,
    InProgress,
    Completed,
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisStatus::Queued => write!(f, "queued"),
            AnalysisStatus::InProgress => write!(f, "in-progress"),
            AnalysisStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Per-category counts as reported upstream. Absent keys mean zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub malicious: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspicious: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harmless: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undetected: Option<u32>,
    #[serde(
        rename = "type-unsupported",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub type_unsupported: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    #[serde(
        rename = "confirmed-timeout",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub confirmed_timeout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<u32>,
}

// ============================================================================
// Engine verdicts
// ============================================================================

/// One engine's categorized opinion on a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineVerdict {
    /// Falls back to the map key when upstream omits it.
    #[serde(default)]
    pub engine_name: String,
    pub category: EngineCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// Verdict category. Unseen categories are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EngineCategory {
    Malicious,
    Suspicious,
    Harmless,
    Undetected,
    TypeUnsupported,
    Timeout,
    ConfirmedTimeout,
    Failure,
    Other(String),
}

impl EngineCategory {
    pub fn as_str(&self) -> &str {
        match self {
            EngineCategory::Malicious => "malicious",
            EngineCategory::Suspicious => "suspicious",
            EngineCategory::Harmless => "harmless",
            EngineCategory::Undetected => "undetected",
            EngineCategory::TypeUnsupported => "type-unsupported",
            EngineCategory::Timeout => "timeout",
            EngineCategory::ConfirmedTimeout => "confirmed-timeout",
            EngineCategory::Failure => "failure",
            EngineCategory::Other(raw) => raw,
        }
    }

    /// Malicious or suspicious.
    pub fn is_flagged(&self) -> bool {
        matches!(self, EngineCategory::Malicious | EngineCategory::Suspicious)
    }
}

impl From<String> for EngineCategory {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "malicious" => EngineCategory::Malicious,
            "suspicious" => EngineCategory::Suspicious,
            "harmless" => EngineCategory::Harmless,
            "undetected" => EngineCategory::Undetected,
            "type-unsupported" => EngineCategory::TypeUnsupported,
            "timeout" => EngineCategory::Timeout,
            "confirmed-timeout" => EngineCategory::ConfirmedTimeout,
            "failure" => EngineCategory::Failure,
            _ => EngineCategory::Other(raw),
        }
    }
}

impl From<EngineCategory> for String {
    fn from(category: EngineCategory) -> String {
        category.as_str().to_string()
    }
}

impl fmt::Display for EngineCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// OrderedMap
// ============================================================================

/// A JSON object kept in source order. Engine listings must be presented in
/// the order upstream sent them.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V>(Vec<(String, V)>);

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert or replace; a replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = OrderedMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct OrderedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
    type Value = OrderedMap<V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = OrderedMap(Vec::with_capacity(access.size_hint().unwrap_or(0)));
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            map.insert(key, value);
        }
        Ok(map)
    }

    // Upstream sends `null` for "no results yet".
    fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(OrderedMap::new())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(OrderedMapVisitor(PhantomData))
    }
}
