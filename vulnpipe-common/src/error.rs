//! Common error types for vulnpipe

use thiserror::Error;

/// Common result type for vulnpipe operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for an ingest run
///
/// Connection errors are fatal at startup; archive and state write
/// errors are per-batch and counted, never aborting the run.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP transport error (wraps reqwest::Error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A sink was unreachable during the startup probe
    #[error("Sink connection error: {0}")]
    SinkConnection(String),

    /// Archive sink rejected a batch (per-batch, non-fatal)
    #[error("Archive write error: {0}")]
    ArchiveWrite(String),

    /// State sink rejected a batch; the batch was rolled back
    #[error("State write error: {0}")]
    StateWrite(String),

    /// A technical identifier could not be enriched (single record skipped)
    #[error("Enrichment error: {0}")]
    Enrichment(String),

    /// A sink call exceeded its configured deadline
    #[error("Timeout: {0}")]
    Timeout(String),
}
