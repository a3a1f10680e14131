//! Run-level counters surfaced at the end of an ingest run

use serde::{Deserialize, Serialize};

/// Aggregate counters for one pipeline run
///
/// Batch-level failures never abort the run; they accumulate here and
/// are reported once the run reaches its final state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Records pulled from the source (including enrichment skips)
    pub records_processed: usize,
    /// Records skipped because the technical id could not be enriched
    pub enrichment_skipped: usize,
    /// Batches handed to both writers
    pub batches_dispatched: usize,
    /// Records confirmed appended to the archive sink
    pub records_archived: usize,
    /// Records confirmed upserted into the state sink
    pub records_upserted: usize,
    /// Archive batches that failed (dropped, not retried)
    pub archive_batches_failed: usize,
    /// State batches that failed (rolled back whole)
    pub state_batches_failed: usize,
}

impl RunSummary {
    pub fn display_string(&self) -> String {
        format!(
            "{} records processed ({} skipped), {} batches dispatched, \
             {} archived, {} upserted, {} archive batch failures, {} state batch failures",
            self.records_processed,
            self.enrichment_skipped,
            self.batches_dispatched,
            self.records_archived,
            self.records_upserted,
            self.archive_batches_failed,
            self.state_batches_failed,
        )
    }
}
