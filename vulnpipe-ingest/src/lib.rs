//! vulnpipe-ingest library interface
//!
//! Exposes the pipeline stages for integration testing: record
//! source, enricher, batcher, sink contracts and the coordinator.

pub mod batch;
pub mod config;
pub mod enrich;
pub mod pipeline;
pub mod sinks;
pub mod source;

pub use config::IngestConfig;
pub use pipeline::{PipelineCoordinator, RunState};
