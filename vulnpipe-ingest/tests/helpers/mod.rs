//! Shared test doubles for pipeline integration tests
//!
//! In-memory sinks behind the real sink traits, so end-to-end runs
//! exercise the coordinator without warehouse or database access.
//! `MemoryState` models the transactional upsert faithfully: a batch
//! is staged on a working copy and only committed whole.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;
use uuid::Uuid;
use vulnpipe_common::{
    ActiveVulnerability, EnrichedFinding, Error, RawFinding, Result, Severity, VulnStatus,
};
use vulnpipe_ingest::sinks::{ArchiveSink, StateSink};
use vulnpipe_ingest::source::RecordSource;

/// Build a raw finding with a fixed score/severity and the given ids
pub fn raw_finding(technical_id: &str, finding_id: &str) -> RawFinding {
    RawFinding {
        scan_id: Uuid::new_v4(),
        scan_date: Utc::now(),
        technical_id: technical_id.to_string(),
        finding_id: finding_id.to_string(),
        score: 7.2,
        severity: Severity::High,
        summary: format!("Found vulnerability {} in {}.", finding_id, technical_id),
    }
}

/// Deterministic source replaying a prepared sequence
pub struct ScriptedSource {
    findings: VecDeque<RawFinding>,
}

impl ScriptedSource {
    pub fn new(findings: Vec<RawFinding>) -> Self {
        Self {
            findings: findings.into(),
        }
    }
}

impl RecordSource for ScriptedSource {
    fn next_finding(&mut self) -> Option<RawFinding> {
        self.findings.pop_front()
    }
}

/// In-memory archive ledger
#[derive(Default)]
pub struct MemoryArchive {
    pub rows: Mutex<Vec<EnrichedFinding>>,
    pub batch_sizes: Mutex<Vec<usize>>,
    fail: AtomicBool,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent append fail
    pub fn fail_writes(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ArchiveSink for MemoryArchive {
    async fn append(&self, batch: &[EnrichedFinding]) -> Result<usize> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::ArchiveWrite("injected archive failure".to_string()));
        }
        self.rows.lock().unwrap().extend_from_slice(batch);
        self.batch_sizes.lock().unwrap().push(batch.len());
        Ok(batch.len())
    }

    async fn check(&self) -> Result<()> {
        Ok(())
    }
}

/// In-memory live-state table with transactional batch semantics
///
/// Timestamps come from a logical clock (one tick per applied record)
/// so tests can assert first_seen/last_seen ordering exactly.
#[derive(Default)]
pub struct MemoryState {
    pub table: Mutex<HashMap<(String, String), ActiveVulnerability>>,
    pub batch_sizes: Mutex<Vec<usize>>,
    clock: AtomicI64,
    poison_finding_id: Mutex<Option<String>>,
}

impl MemoryState {
    const EPOCH: i64 = 1_700_000_000;

    pub fn new() -> Self {
        Self::default()
    }

    fn tick(&self) -> DateTime<Utc> {
        let n = self.clock.fetch_add(1, Ordering::SeqCst);
        Utc.timestamp_opt(Self::EPOCH + n, 0).single().unwrap()
    }

    /// Seed a key as already resolved, the way the external
    /// remediation process would leave it.
    pub fn seed_fixed(&self, stable_identity: &str, finding_id: &str) -> DateTime<Utc> {
        let first_seen = self.tick();
        let row = ActiveVulnerability {
            stable_identity: stable_identity.to_string(),
            technical_id: "asset-prior".to_string(),
            owner: "Platform Team".to_string(),
            region: "us-east1".to_string(),
            finding_id: finding_id.to_string(),
            score: 6.0,
            severity: "Medium".to_string(),
            status: VulnStatus::Fixed,
            first_seen,
            last_seen: first_seen,
            summary: "previously resolved".to_string(),
        };
        self.table.lock().unwrap().insert(
            (stable_identity.to_string(), finding_id.to_string()),
            row,
        );
        first_seen
    }

    /// Fail any batch that contains this finding id (mid-batch error)
    pub fn poison(&self, finding_id: &str) {
        *self.poison_finding_id.lock().unwrap() = Some(finding_id.to_string());
    }

    pub fn get(&self, stable_identity: &str, finding_id: &str) -> Option<ActiveVulnerability> {
        self.table
            .lock()
            .unwrap()
            .get(&(stable_identity.to_string(), finding_id.to_string()))
            .cloned()
    }

    pub fn row_count(&self) -> usize {
        self.table.lock().unwrap().len()
    }
}

#[async_trait]
impl StateSink for MemoryState {
    async fn upsert(&self, batch: &[EnrichedFinding]) -> Result<usize> {
        let mut table = self.table.lock().unwrap();
        // Stage on a working copy; commit only if every record applies
        let mut staged = table.clone();
        let poison = self.poison_finding_id.lock().unwrap().clone();

        for finding in batch {
            if poison.as_deref() == Some(finding.raw.finding_id.as_str()) {
                return Err(Error::StateWrite(format!(
                    "injected failure on {}",
                    finding.raw.finding_id
                )));
            }

            let now = self.tick();
            let key = finding.state_key();
            match staged.get_mut(&key) {
                Some(row) => {
                    row.last_seen = now;
                    row.technical_id = finding.raw.technical_id.clone();
                    // Reappearance reopens a resolved finding; an open
                    // finding is unaffected.
                    if row.status == VulnStatus::Fixed {
                        row.status = VulnStatus::Open;
                    }
                }
                None => {
                    staged.insert(
                        key,
                        ActiveVulnerability {
                            stable_identity: finding.stable_identity.clone(),
                            technical_id: finding.raw.technical_id.clone(),
                            owner: finding.owner.clone(),
                            region: finding.region.clone(),
                            finding_id: finding.raw.finding_id.clone(),
                            score: finding.raw.score,
                            severity: finding.raw.severity.as_str().to_string(),
                            status: VulnStatus::Open,
                            first_seen: now,
                            last_seen: now,
                            summary: finding.raw.summary.clone(),
                        },
                    );
                }
            }
        }

        *table = staged;
        self.batch_sizes.lock().unwrap().push(batch.len());
        Ok(batch.len())
    }

    async fn check(&self) -> Result<()> {
        Ok(())
    }
}
