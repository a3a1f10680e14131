//! Shared types for the vulnpipe ingest pipeline
//!
//! Holds the finding models, the error taxonomy, and the run summary
//! counters used by the ingest service and its tests.

pub mod error;
pub mod models;
pub mod summary;

pub use error::{Error, Result};
pub use models::{ActiveVulnerability, EnrichedFinding, RawFinding, Severity, VulnStatus};
pub use summary::RunSummary;
