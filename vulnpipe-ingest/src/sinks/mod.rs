//! Sink contracts for the dual-write pipeline
//!
//! The archive sink is an append-only ledger with relaxed delivery
//! (failed batches are dropped); the state sink is transactional and
//! must see batches in arrival order. Both are behind traits so the
//! pipeline and its tests run without warehouse or database access.

use async_trait::async_trait;
use vulnpipe_common::{EnrichedFinding, Result};

pub mod archive;
pub mod state;

pub use archive::WarehouseArchive;
pub use state::PostgresState;

/// Append-only historical sink
#[async_trait]
pub trait ArchiveSink: Send + Sync {
    /// Append the batch; returns the number of rows appended.
    ///
    /// No idempotence is required: duplicate appends are acceptable
    /// because the sink is a ledger.
    async fn append(&self, batch: &[EnrichedFinding]) -> Result<usize>;

    /// Startup connectivity probe. A failure here is fatal to the run.
    async fn check(&self) -> Result<()>;
}

/// Live-state sink keyed by `(stable_identity, finding_id)`
#[async_trait]
pub trait StateSink: Send + Sync {
    /// Upsert the batch as a single atomic transaction; returns the
    /// number of rows touched. On any failure the whole batch rolls
    /// back — partial application is disallowed.
    async fn upsert(&self, batch: &[EnrichedFinding]) -> Result<usize>;

    /// Startup connectivity probe. A failure here is fatal to the run.
    async fn check(&self) -> Result<()>;
}
