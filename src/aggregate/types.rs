use crate::ledger::types::ChunkId;
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::path::PathBuf;

/// Per-chunk counters produced by a worker.
///
/// Merging is plain addition, so the order in which chunks finish never matters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Metrics {
    pub error_count: u64,
    pub total_response_time_ms: u64,
    pub request_count: u64,
}

impl Metrics {
    pub fn average_response_time_ms(&self) -> Option<f64> {
        if self.request_count == 0 {
            return None;
        }
        Some(self.total_response_time_ms as f64 / self.request_count as f64)
    }

    /// Sum of both, or `None` if any counter would overflow.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        Some(Self {
            error_count: self.error_count.checked_add(other.error_count)?,
            total_response_time_ms: self
                .total_response_time_ms
                .checked_add(other.total_response_time_ms)?,
            request_count: self.request_count.checked_add(other.request_count)?,
        })
    }
}

/// Saturates at `u64::MAX`; use [`Metrics::checked_add`] to detect overflow.
impl AddAssign for Metrics {
    fn add_assign(&mut self, other: Self) {
        self.error_count = self.error_count.saturating_add(other.error_count);
        self.total_response_time_ms = self
            .total_response_time_ms
            .saturating_add(other.total_response_time_ms);
        self.request_count = self.request_count.saturating_add(other.request_count);
    }
}

impl Add for Metrics {
    type Output = Metrics;

    fn add(mut self, other: Self) -> Self::Output {
        self += other;
        self
    }
}

impl Sum for Metrics {
    fn sum<I: Iterator<Item = Metrics>>(iter: I) -> Self {
        iter.fold(Metrics::default(), Add::add)
    }
}

/// A byte range that was never processed because all its attempts expired.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailedChunk {
    pub chunk_id: ChunkId,
    pub offset: u64,
    pub length: u64,
    pub attempts: u32,
}

/// Final result of a job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregateReport {
    pub path: PathBuf,
    pub file_size: u64,
    pub metrics: Metrics,
    pub average_response_time_ms: Option<f64>,
    pub chunks_total: usize,
    pub chunks_done: usize,
    pub failed_chunks: Vec<FailedChunk>,
    /// Bytes covered by `failed_chunks`.
    pub failed_bytes: u64,
}

impl AggregateReport {
    pub fn is_complete_success(&self) -> bool {
        self.failed_chunks.is_empty()
    }
}
