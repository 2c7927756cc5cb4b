//! Error types for the log analyzer.
//!
//! The library reports failures through [`AnalyzerError`]. The HTTP layer maps each
//! variant to a status code in one place ([`AnalyzerError::status_code`]) so handlers
//! stay free of ad-hoc error translation.

use crate::ledger::types::ChunkId;
use crate::registry::types::WorkerId;
use axum::http::StatusCode;
use thiserror::Error;

/// Result type alias for analyzer operations.
pub type Result<T> = std::result::Result<T, AnalyzerError>;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// Zero-length file, zero chunk target, or an inconsistent configuration.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The worker was never registered or has been declared dead.
    #[error("unknown worker: {0}")]
    UnknownWorker(WorkerId),

    /// A worker with this id is already active.
    #[error("duplicate worker: {0}")]
    DuplicateWorker(WorkerId),

    /// Submission for a chunk the worker no longer holds.
    #[error("stale submission for chunk {chunk_id} from worker {worker_id}")]
    StaleSubmission { chunk_id: ChunkId, worker_id: WorkerId },

    /// The chunk failed on every allowed attempt.
    #[error("chunk {chunk_id} exhausted after {attempts} attempts")]
    ChunkExhausted { chunk_id: ChunkId, attempts: u32 },

    #[error("no job has been started")]
    NoActiveJob,

    #[error("a job is already in progress")]
    JobInProgress,

    #[error("job incomplete: {remaining} chunks still pending or leased")]
    JobIncomplete { remaining: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalyzerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AnalyzerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AnalyzerError::UnknownWorker(_) => StatusCode::NOT_FOUND,
            AnalyzerError::DuplicateWorker(_) => StatusCode::CONFLICT,
            // Stale submissions are acknowledged, never rejected.
            AnalyzerError::StaleSubmission { .. } => StatusCode::OK,
            AnalyzerError::ChunkExhausted { .. } => StatusCode::OK,
            AnalyzerError::NoActiveJob => StatusCode::NOT_FOUND,
            AnalyzerError::JobInProgress => StatusCode::CONFLICT,
            AnalyzerError::JobIncomplete { .. } => StatusCode::CONFLICT,
            AnalyzerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
