//! vulnpipe-ingest - Vulnerability finding ingest service
//!
//! Pulls raw scan findings from the record source, enriches each one
//! with stable business identity, and dual-writes batches to the
//! historical archive (concurrent, best-effort) and the live-state
//! table (synchronous, transactional, order-preserving).

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use vulnpipe_ingest::config::{Args, IngestConfig};
use vulnpipe_ingest::enrich::{Enricher, IdentityRule};
use vulnpipe_ingest::pipeline::PipelineCoordinator;
use vulnpipe_ingest::sinks::{ArchiveSink, PostgresState, StateSink, WarehouseArchive};
use vulnpipe_ingest::source::SimulatedScanSource;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting vulnpipe-ingest v{}", env!("CARGO_PKG_VERSION"));

    let config = IngestConfig::from_args(Args::parse());
    info!(
        "Run shape: {} records, batch size {}, {} archive workers, {:?} sink timeout",
        config.total_records, config.batch_size, config.archive_workers, config.sink_timeout
    );

    // Both sinks must be reachable before any record is pulled;
    // a failed probe aborts the run with a non-zero exit.
    let archive = WarehouseArchive::new(
        &config.archive_endpoint,
        &config.archive_table,
        config.archive_token.clone(),
        config.sink_timeout,
    )?;
    match archive.check().await {
        Ok(()) => info!("✓ Archive sink reachable ({})", config.archive_table),
        Err(e) => {
            error!("Archive sink probe failed: {}", e);
            return Err(e.into());
        }
    }

    let state_sink = PostgresState::connect(&config.state_url, config.sink_timeout).await?;
    state_sink.check().await?;
    state_sink.ensure_schema().await?;
    info!("✓ State sink reachable");

    let source = SimulatedScanSource::new(config.total_records);
    let enricher = Enricher::new(IdentityRule::default());
    let state_sink = Arc::new(state_sink);

    let coordinator = PipelineCoordinator::new(
        source,
        enricher,
        config.batch_size,
        Arc::new(archive),
        Arc::clone(&state_sink),
        config.archive_workers,
        config.sink_timeout,
    );

    let summary = coordinator.run().await?;
    info!("Run complete: {}", summary.display_string());

    match state_sink.status_counts().await {
        Ok(counts) => {
            for (status, count) in counts {
                info!("State sink: {} rows with status {}", count, status);
            }
        }
        Err(e) => error!("Status read-back failed: {}", e),
    }

    Ok(())
}
