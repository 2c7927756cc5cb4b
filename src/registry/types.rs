use crate::ledger::types::ChunkId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity a worker registers under.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub String);

impl WorkerId {
    /// Derives a never-before-seen identity from this one.
    ///
    /// A worker declared dead cannot resume under its old id; it comes back as
    /// `<old id>-<uuid>` instead.
    pub fn fresh_from(&self) -> Self {
        Self(format!("{}-{}", self.0, uuid::Uuid::new_v4()))
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WorkerStatus {
    Registered,
    Idle,
    /// Holds exactly one leased chunk.
    Busy,
    /// Missed heartbeats past the dead threshold. Terminal for this id.
    Dead,
}

impl WorkerStatus {
    pub fn is_active(self) -> bool {
        !matches!(self, WorkerStatus::Dead)
    }
}

/// Registry entry for a single worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerEntry {
    pub id: WorkerId,
    pub status: WorkerStatus,
    /// Timestamp (ms) of the last heartbeat or registration.
    pub last_heartbeat_at: u64,
    pub current_chunk: Option<ChunkId>,
}

/// A worker the failure detector just declared dead, with the chunk it was holding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadWorker {
    pub worker_id: WorkerId,
    pub held_chunk: Option<ChunkId>,
    pub silent_for_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerStatusCounts {
    pub registered: usize,
    pub idle: usize,
    pub busy: usize,
    pub dead: usize,
}
