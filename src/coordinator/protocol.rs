//! Network Protocol Definitions
//!
//! Request and response bodies exchanged between workers and the coordinator, and
//! the endpoint paths both sides agree on.

use crate::aggregate::types::{AggregateReport, Metrics};
use crate::ledger::types::{Chunk, ChunkId, ChunkStatusCounts};
use crate::registry::types::{WorkerId, WorkerStatusCounts};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENDPOINT_REGISTER: &str = "/register_worker";
pub const ENDPOINT_HEARTBEAT: &str = "/heartbeat";
pub const ENDPOINT_REQUEST_ASSIGNMENT: &str = "/request_assignment";
pub const ENDPOINT_SUBMIT_RESULTS: &str = "/submit_results";
pub const ENDPOINT_JOB: &str = "/job";
pub const ENDPOINT_STATUS: &str = "/status";
pub const ENDPOINT_REPORT: &str = "/report";

/// Body of register, heartbeat and assignment requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub worker_id: WorkerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub ok: bool,
    pub message: String,
}

impl AckResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// A chunk handed to a worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Assignment {
    pub chunk_id: ChunkId,
    pub path: PathBuf,
    pub offset: u64,
    pub length: u64,
}

impl Assignment {
    pub fn for_chunk(chunk: &Chunk, path: PathBuf) -> Self {
        Self {
            chunk_id: chunk.id,
            path,
            offset: chunk.offset,
            length: chunk.length,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssignmentResponse {
    pub assignment: Option<Assignment>,
    /// Set once every chunk of the current job is `Done` or `Failed`.
    pub job_complete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResultRequest {
    pub worker_id: WorkerId,
    pub chunk_id: ChunkId,
    pub metrics: Metrics,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmitResultResponse {
    pub accepted: bool,
    /// The worker no longer held the chunk; the result was discarded.
    pub stale: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartJobRequest {
    pub path: PathBuf,
    pub chunk_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartJobResponse {
    pub path: PathBuf,
    pub file_size: u64,
    pub chunks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub workers: WorkerStatusCounts,
    pub chunks: Option<ChunkStatusCounts>,
    pub job_complete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResponse {
    pub report: Option<AggregateReport>,
    pub message: String,
}
