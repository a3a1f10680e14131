//! Pipeline coordinator
//!
//! Drives the run through its states:
//!
//! Idle → Streaming → Draining → Done
//!
//! Streaming pulls records, enriches them and accumulates batches.
//! A full batch is dispatched to both writers: the archive write is
//! spawned onto a bounded worker pool and runs concurrently with
//! subsequent work; the state write is awaited inline so successive
//! upserts to the same key are applied in arrival order (the status
//! monotonicity rule depends on this ordering). Draining dispatches
//! the final partial batch the same way, and Done joins every
//! outstanding archive task before the run returns.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use vulnpipe_common::{EnrichedFinding, Error, Result, RunSummary};

use crate::batch::Batcher;
use crate::enrich::Enricher;
use crate::sinks::{ArchiveSink, StateSink};
use crate::source::RecordSource;

/// Run states; transitions are one-directional and never re-entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Streaming,
    Draining,
    Done,
}

pub struct PipelineCoordinator<S, A, T>
where
    S: RecordSource,
    A: ArchiveSink + 'static,
    T: StateSink,
{
    source: S,
    enricher: Enricher,
    batcher: Batcher,
    archive: Arc<A>,
    state_sink: Arc<T>,
    archive_workers: usize,
    sink_timeout: Duration,
    run_state: RunState,
    summary: RunSummary,
}

impl<S, A, T> PipelineCoordinator<S, A, T>
where
    S: RecordSource,
    A: ArchiveSink + 'static,
    T: StateSink,
{
    pub fn new(
        source: S,
        enricher: Enricher,
        batch_size: usize,
        archive: Arc<A>,
        state_sink: Arc<T>,
        archive_workers: usize,
        sink_timeout: Duration,
    ) -> Self {
        Self {
            source,
            enricher,
            batcher: Batcher::new(batch_size),
            archive,
            state_sink,
            archive_workers: archive_workers.max(1),
            sink_timeout,
            run_state: RunState::Idle,
            summary: RunSummary::default(),
        }
    }

    /// Drive the run to completion and return the counters
    ///
    /// Batch-level failures are counted, never fatal; a run that
    /// reaches Done is a successful run.
    pub async fn run(mut self) -> Result<RunSummary> {
        let mut archive_tasks: JoinSet<Result<usize>> = JoinSet::new();

        self.transition(RunState::Streaming);
        while let Some(raw) = self.source.next_finding() {
            self.summary.records_processed += 1;
            match self.enricher.enrich(&raw) {
                Ok(enriched) => self.batcher.add(enriched),
                Err(e) => {
                    warn!("Skipping record {}: {}", raw.scan_id, e);
                    self.summary.enrichment_skipped += 1;
                    continue;
                }
            }

            if self.batcher.is_full() {
                let batch = self.batcher.drain();
                self.dispatch(batch, &mut archive_tasks).await;
            }
        }

        self.transition(RunState::Draining);
        if !self.batcher.is_empty() {
            let batch = self.batcher.drain();
            self.dispatch(batch, &mut archive_tasks).await;
        }

        // Join every in-flight archive write, success or failure,
        // before declaring the run finished.
        while let Some(joined) = archive_tasks.join_next().await {
            self.record_archive_result(joined);
        }
        self.transition(RunState::Done);

        Ok(self.summary)
    }

    /// Hand a drained batch to both writers
    ///
    /// Archive first (spawned, non-blocking), then the state write
    /// inline. Each writer gets an independent read-only view of the
    /// batch via `Arc`.
    async fn dispatch(
        &mut self,
        batch: Vec<EnrichedFinding>,
        archive_tasks: &mut JoinSet<Result<usize>>,
    ) {
        let size = batch.len();
        self.summary.batches_dispatched += 1;
        debug!("Dispatching batch of {} findings", size);

        let batch = Arc::new(batch);

        // Bounded pool: when all workers are busy, reap one finished
        // task before spawning the next.
        while archive_tasks.len() >= self.archive_workers {
            if let Some(joined) = archive_tasks.join_next().await {
                self.record_archive_result(joined);
            }
        }

        let archive = Arc::clone(&self.archive);
        let archive_batch = Arc::clone(&batch);
        let timeout = self.sink_timeout;
        archive_tasks.spawn(async move {
            match tokio::time::timeout(timeout, archive.append(&archive_batch)).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout(format!(
                    "archive write of {} rows exceeded {:?}",
                    archive_batch.len(),
                    timeout
                ))),
            }
        });

        // State write stays on the control task: batch arrival order
        // is the ordering guarantee for same-key upserts.
        let state_result = match tokio::time::timeout(timeout, self.state_sink.upsert(&batch)).await
        {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "state upsert of {} rows exceeded {:?}",
                size, timeout
            ))),
        };

        match state_result {
            Ok(count) => {
                self.summary.records_upserted += count;
                debug!("Upserted {} findings into state sink", count);
            }
            Err(e) => {
                // Batch rolled back whole by the sink; drop and continue
                error!("State write failed, batch of {} rolled back: {}", size, e);
                self.summary.state_batches_failed += 1;
            }
        }
    }

    fn record_archive_result(
        &mut self,
        joined: std::result::Result<Result<usize>, tokio::task::JoinError>,
    ) {
        match joined {
            Ok(Ok(count)) => {
                self.summary.records_archived += count;
                debug!("Archived {} findings", count);
            }
            Ok(Err(e)) => {
                error!("Archive write failed, batch dropped: {}", e);
                self.summary.archive_batches_failed += 1;
            }
            Err(e) => {
                error!("Archive worker panicked, batch dropped: {}", e);
                self.summary.archive_batches_failed += 1;
            }
        }
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(matches!(
            (self.run_state, next),
            (RunState::Idle, RunState::Streaming)
                | (RunState::Streaming, RunState::Draining)
                | (RunState::Draining, RunState::Done)
        ));
        info!("Pipeline state: {:?} → {:?}", self.run_state, next);
        self.run_state = next;
    }
}
