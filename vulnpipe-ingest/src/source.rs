//! Scan record source
//!
//! The pipeline only needs a sequence-producing contract; production
//! deployments replace `SimulatedScanSource` with an adapter over the
//! real scan stream.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use uuid::Uuid;
use vulnpipe_common::{RawFinding, Severity};

/// Produces raw findings one at a time
///
/// Finite for a bounded run, may be unbounded for a live stream.
/// Restartability is not part of the contract.
pub trait RecordSource {
    fn next_finding(&mut self) -> Option<RawFinding>;
}

/// Mock scan stream mirroring what a scanner export looks like:
/// a fixed pool of ephemeral asset ids hit by a fixed pool of CVEs,
/// with uniform-ish scores and severities.
pub struct SimulatedScanSource {
    assets: Vec<String>,
    cves: Vec<String>,
    remaining: usize,
    rng: StdRng,
}

impl SimulatedScanSource {
    /// 100 unique assets, 50 unique CVEs
    const ASSET_POOL: usize = 100;
    const CVE_POOL: usize = 50;

    pub fn new(total_records: usize) -> Self {
        let mut rng = StdRng::from_entropy();
        let assets = (1..=Self::ASSET_POOL)
            .map(|i| format!("asset-{}", i))
            .collect();
        let cves = (0..Self::CVE_POOL)
            .map(|_| format!("CVE-2024-{}", rng.gen_range(1000..=9999)))
            .collect();
        Self {
            assets,
            cves,
            remaining: total_records,
            rng,
        }
    }
}

impl RecordSource for SimulatedScanSource {
    fn next_finding(&mut self) -> Option<RawFinding> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        // Pools are non-empty by construction
        let asset = self.assets.choose(&mut self.rng)?.clone();
        let cve = self.cves.choose(&mut self.rng)?.clone();
        let score = (self.rng.gen_range(4.0..=10.0_f64) * 10.0).round() / 10.0;
        let severity = match self.rng.gen_range(0..3) {
            0 => Severity::Medium,
            1 => Severity::High,
            _ => Severity::Critical,
        };

        Some(RawFinding {
            scan_id: Uuid::new_v4(),
            scan_date: Utc::now(),
            summary: format!(
                "Found vulnerability {} in {}. Recommendation: Patch immediately.",
                cve, asset
            ),
            technical_id: asset,
            finding_id: cve,
            score,
            severity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_source_yields_exactly_total_records() {
        let mut source = SimulatedScanSource::new(17);
        let mut count = 0;
        while source.next_finding().is_some() {
            count += 1;
        }
        assert_eq!(count, 17);
        // Exhausted source stays exhausted
        assert!(source.next_finding().is_none());
    }

    #[test]
    fn findings_draw_from_fixed_pools() {
        let mut source = SimulatedScanSource::new(200);
        while let Some(finding) = source.next_finding() {
            assert!(finding.technical_id.starts_with("asset-"));
            assert!(finding.finding_id.starts_with("CVE-2024-"));
            assert!(finding.score >= 4.0 && finding.score <= 10.0);
        }
    }
}
