//! Detection Tally & Threat Assessment
//!
//! Aggregate verdict counts and the deterministic threat summary derived from
//! them. The `total` used for the percentage is always the sum of the
//! categories the originating result shape reports, never a fixed constant
//! and never a subset of the tally.

use serde::{Deserialize, Serialize};

use crate::result::AnalysisStats;

/// Coarse threat classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Safe,
    Warning,
    Danger,
}

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::Safe => "safe",
            ThreatLevel::Warning => "warning",
            ThreatLevel::Danger => "danger",
        }
    }
}

/// Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatAssessment {
    /// 0..=100
    pub percentage: u8,
    pub level: ThreatLevel,
}

/// Verdict counts for one result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionTally {
    pub malicious: u32,
    pub suspicious: u32,
    pub harmless: u32,
    pub undetected: u32,
    pub unsupported: u32,
    pub failures: u32,
    pub timeouts: u32,
    pub confirmed_timeouts: u32,
    /// Sum of the categories the result shape reports. Wider than the
    /// counts so upstream values cannot overflow it.
    pub total: u64,
}

impl DetectionTally {
    /// Tally for a hash lookup. The lookup shape reports malicious,
    /// suspicious, harmless and undetected; only those make up the total.
    pub fn for_lookup(stats: &AnalysisStats) -> Self {
        let malicious = stats.malicious.unwrap_or(0);
        let suspicious = stats.suspicious.unwrap_or(0);
        let harmless = stats.harmless.unwrap_or(0);
        let undetected = stats.undetected.unwrap_or(0);

        Self {
            malicious,
            suspicious,
            harmless,
            undetected,
            unsupported: 0,
            failures: 0,
            timeouts: 0,
            confirmed_timeouts: 0,
            total: sum(&[malicious, suspicious, harmless, undetected]),
        }
    }

    /// Tally for a multi-engine analysis. Unsupported verdicts count toward
    /// the total; failures and timeouts are tracked separately.
    pub fn for_analysis(stats: &AnalysisStats) -> Self {
        let malicious = stats.malicious.unwrap_or(0);
        let suspicious = stats.suspicious.unwrap_or(0);
        let harmless = stats.harmless.unwrap_or(0);
        let undetected = stats.undetected.unwrap_or(0);
        let unsupported = stats.type_unsupported.unwrap_or(0);

        Self {
            malicious,
            suspicious,
            harmless,
            undetected,
            unsupported,
            failures: stats.failure.unwrap_or(0),
            timeouts: stats.timeout.unwrap_or(0),
            confirmed_timeouts: stats.confirmed_timeout.unwrap_or(0),
            total: sum(&[malicious, suspicious, harmless, undetected, unsupported]),
        }
    }

    /// `round(100 * (malicious + suspicious) / total)`, or 0 for an empty tally.
    /// Halves round up.
    pub fn threat_percentage(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let flagged = (self.malicious as u64 + self.suspicious as u64).min(self.total);
        ((200 * flagged + self.total) / (2 * self.total)) as u8
    }

    /// Malicious beats suspicious beats everything else.
    pub fn threat_level(&self) -> ThreatLevel {
        if self.malicious > 0 {
            ThreatLevel::Danger
        } else if self.suspicious > 0 {
            ThreatLevel::Warning
        } else {
            ThreatLevel::Safe
        }
    }

    pub fn assessment(&self) -> ThreatAssessment {
        ThreatAssessment {
            percentage: self.threat_percentage(),
            level: self.threat_level(),
        }
    }
}

fn sum(counts: &[u32]) -> u64 {
    counts.iter().map(|&c| u64::from(c)).sum()
}
