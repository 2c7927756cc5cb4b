//! Result Aggregation
//!
//! Results are stored by chunk id, never by worker id. A chunk processed by several
//! workers across retries therefore contributes exactly once, whoever finished it.

use super::types::*;
use crate::error::{AnalyzerError, Result};
use crate::ledger::ledger::ChunkLedger;
use crate::ledger::types::{ChunkId, ChunkStatus};

use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Default)]
pub struct Aggregator {
    results: HashMap<ChunkId, Metrics>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the result of a chunk.
    ///
    /// Returns `false` and keeps the first result if the chunk already has one.
    pub fn record_chunk_result(&mut self, chunk_id: ChunkId, metrics: Metrics) -> bool {
        if self.results.contains_key(&chunk_id) {
            tracing::warn!("Ignoring duplicate result for chunk {}", chunk_id);
            return false;
        }

        self.results.insert(chunk_id, metrics);
        true
    }

    /// Rejects a result that would overflow the running total.
    ///
    /// Results come from the network; one oversized submission must not poison the
    /// sum of every other chunk.
    pub fn admit(&self, chunk_id: ChunkId, metrics: Metrics) -> Result<()> {
        match self.running_total().checked_add(metrics) {
            Some(_) => Ok(()),
            None => Err(AnalyzerError::InvalidInput(format!(
                "metrics for chunk {} overflow the job total",
                chunk_id
            ))),
        }
    }

    pub fn has_result(&self, chunk_id: ChunkId) -> bool {
        self.results.contains_key(&chunk_id)
    }

    pub fn recorded(&self) -> usize {
        self.results.len()
    }

    /// Sum of everything recorded so far.
    pub fn running_total(&self) -> Metrics {
        self.results.values().copied().sum()
    }

    /// Builds the final report once every chunk in `ledger` is `Done` or `Failed`.
    ///
    /// Only results of chunks the ledger considers `Done` are summed. Failed chunks
    /// are listed with their byte ranges.
    pub fn finalize(&self, ledger: &ChunkLedger, path: &Path, file_size: u64) -> Result<AggregateReport> {
        let remaining = ledger.remaining();
        if remaining > 0 {
            return Err(AnalyzerError::JobIncomplete { remaining });
        }

        let mut metrics = Metrics::default();
        let mut chunks_done = 0;
        let mut failed_chunks = Vec::new();

        for chunk in ledger.chunks() {
            match chunk.status {
                ChunkStatus::Done => {
                    chunks_done += 1;
                    match self.results.get(&chunk.id) {
                        Some(result) => metrics += *result,
                        None => tracing::error!("Chunk {} is done but has no recorded result", chunk.id),
                    }
                }
                ChunkStatus::Failed => failed_chunks.push(FailedChunk {
                    chunk_id: chunk.id,
                    offset: chunk.offset,
                    length: chunk.length,
                    attempts: chunk.attempt_count,
                }),
                ChunkStatus::Pending | ChunkStatus::Leased => {}
            }
        }

        let failed_bytes = failed_chunks.iter().map(|chunk| chunk.length).sum();

        Ok(AggregateReport {
            path: path.to_path_buf(),
            file_size,
            average_response_time_ms: metrics.average_response_time_ms(),
            metrics,
            chunks_total: ledger.len(),
            chunks_done,
            failed_chunks,
            failed_bytes,
        })
    }
}
