//! scanlens Core
//!
//! Foundational types for the scanlens workspace: the error taxonomy, the raw
//! scan result model, detection tallies, the threat context builder and the
//! summary stream frame protocol. This crate has no I/O and no async runtime.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `result` - Raw result sum type (`RawScanResult`) and its wire shapes
//! - `tally` - Detection tally and threat assessment
//! - `context` - Pure builder from raw result to `ThreatContext`
//! - `streaming` - Summary stream frame types

pub mod context;
pub mod error;
pub mod result;
pub mod streaming;
pub mod tally;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Result Model ───────────────────────────────────────────────────────
pub use result::{
    AnalysisAttributes, AnalysisObject, AnalysisStats, AnalysisStatus, EngineCategory,
    EngineVerdict, FileAttributes, FileObject, OrderedMap, RawScanResult, ResultKind,
};

// ── Threat Derivation ──────────────────────────────────────────────────
pub use context::{AnalysisContext, FileContext, FlaggedEngine, ThreatContext};
pub use tally::{DetectionTally, ThreatAssessment, ThreatLevel};

// ── Streaming Types ────────────────────────────────────────────────────
pub use streaming::{AdapterError, SummaryFrame};
