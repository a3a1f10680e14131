//! Finding models shared across the pipeline
//!
//! `RawFinding` is what the scanner stream produces; `EnrichedFinding`
//! adds the derived business identity. Both are immutable once built —
//! the pipeline never mutates a record after enrichment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity as reported by the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an active vulnerability row
///
/// The upsert path only ever moves `Fixed` back to `Open` on
/// reappearance; it never sets `Fixed` itself (that is done by an
/// external remediation process).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VulnStatus {
    Open,
    Fixed,
}

impl VulnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VulnStatus::Open => "Open",
            VulnStatus::Fixed => "Fixed",
        }
    }
}

impl std::fmt::Display for VulnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One raw finding from the scan stream
///
/// `technical_id` is the scanner's ephemeral asset identifier; it is
/// not stable across rescans and must not be used as a business key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFinding {
    pub scan_id: Uuid,
    pub scan_date: DateTime<Utc>,
    pub technical_id: String,
    pub finding_id: String,
    pub score: f64,
    pub severity: Severity,
    pub summary: String,
}

/// A raw finding plus its derived business identity
///
/// `stable_identity`, `owner` and `region` are a pure function of
/// `technical_id` for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedFinding {
    #[serde(flatten)]
    pub raw: RawFinding,
    pub stable_identity: String,
    pub owner: String,
    pub region: String,
}

impl EnrichedFinding {
    /// Natural key in the state sink: `(stable_identity, finding_id)`
    pub fn state_key(&self) -> (String, String) {
        (self.stable_identity.clone(), self.raw.finding_id.clone())
    }
}

/// One row of the live-state table, keyed by `(stable_identity, finding_id)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveVulnerability {
    pub stable_identity: String,
    pub technical_id: String,
    pub owner: String,
    pub region: String,
    pub finding_id: String,
    pub score: f64,
    pub severity: String,
    pub status: VulnStatus,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub summary: String,
}
