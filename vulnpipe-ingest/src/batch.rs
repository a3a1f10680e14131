//! Batch accumulation
//!
//! The batcher buffers enriched findings in insertion order until the
//! configured size is reached. It is not thread-safe by contract: the
//! coordinator is the only owner and serializes all access.

use vulnpipe_common::EnrichedFinding;

#[derive(Debug)]
pub struct Batcher {
    buffer: Vec<EnrichedFinding>,
    batch_size: usize,
}

impl Batcher {
    pub fn new(batch_size: usize) -> Self {
        // A zero batch size would never dispatch anything
        debug_assert!(batch_size > 0);
        Self {
            buffer: Vec::with_capacity(batch_size),
            batch_size,
        }
    }

    /// Append one finding; order of addition is preserved
    pub fn add(&mut self, finding: EnrichedFinding) {
        self.buffer.push(finding);
    }

    /// True once the buffer has reached the configured batch size
    pub fn is_full(&self) -> bool {
        self.buffer.len() >= self.batch_size
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Take the buffered batch and reset to empty in one step
    pub fn drain(&mut self) -> Vec<EnrichedFinding> {
        std::mem::take(&mut self.buffer)
    }
}
