use crate::registry::types::WorkerId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a chunk within its file. Ids are assigned in file order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(pub u32);

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a chunk in the ledger.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChunkStatus {
    /// Waiting for a worker.
    Pending,
    /// Held by exactly one worker until `lease_expires`.
    Leased,
    /// A result was accepted and handed to the aggregator.
    Done,
    /// Every allowed attempt expired. Never scheduled again.
    Failed,
}

impl ChunkStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ChunkStatus::Done | ChunkStatus::Failed)
    }
}

/// A contiguous, line-aligned byte range of the input file and its scheduling state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub id: ChunkId,
    pub offset: u64,
    pub length: u64,
    pub status: ChunkStatus,
    /// The worker holding the lease (if Leased).
    pub assigned_to: Option<WorkerId>,
    /// Timestamp (ms) when the current lease expires.
    pub lease_expires: Option<u64>,
    /// Leases that ended without an accepted result.
    pub attempt_count: u32,
}

impl Chunk {
    pub fn new(id: ChunkId, offset: u64, length: u64) -> Self {
        Self {
            id,
            offset,
            length,
            status: ChunkStatus::Pending,
            assigned_to: None,
            lease_expires: None,
            attempt_count: 0,
        }
    }

    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

/// What happened to a chunk whose lease was taken away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReclaimOutcome {
    /// Back in the pending pool.
    Requeued,
    /// Attempts exhausted, now `Failed`.
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reclaimed {
    pub chunk_id: ChunkId,
    pub worker_id: WorkerId,
    pub attempt_count: u32,
    pub outcome: ReclaimOutcome,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkStatusCounts {
    pub pending: usize,
    pub leased: usize,
    pub done: usize,
    pub failed: usize,
}

/// Helper to get the current system time in milliseconds.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
