//! Coordinator State Machine
//!
//! The single authority over the worker registry, the chunk ledger and the
//! aggregator. All three live in one `CoordinatorState` behind one lock, so a
//! request handler and the failure-detector sweep can never interleave halfway
//! through a chunk transition.
//!
//! Every operation takes the current time (ms) as an argument. Handlers pass the
//! wall clock; tests drive time explicitly.

use super::protocol::*;
use crate::aggregate::aggregator::Aggregator;
use crate::aggregate::types::{AggregateReport, Metrics};
use crate::config::CoordinationConfig;
use crate::error::{AnalyzerError, Result};
use crate::ledger::ledger::ChunkLedger;
use crate::ledger::types::{Chunk, ChunkId, ChunkStatus, ReclaimOutcome};
use crate::partition::partitioner::partition_file;
use crate::registry::registry::WorkerRegistry;
use crate::registry::types::{WorkerEntry, WorkerId};

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};

/// Dead registry entries are dropped once silent for this many dead thresholds.
const DEAD_RETENTION_FACTOR: u64 = 10;

/// One file being analyzed.
struct Job {
    path: PathBuf,
    file_size: u64,
    ledger: ChunkLedger,
    aggregator: Aggregator,
    /// Set exactly once, when the last chunk becomes terminal.
    report: Option<AggregateReport>,
}

#[derive(Default)]
struct CoordinatorState {
    registry: WorkerRegistry,
    job: Option<Job>,
}

/// What a single failure-detector pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub dead_workers: Vec<WorkerId>,
    pub requeued: Vec<ChunkId>,
    pub exhausted: Vec<ChunkId>,
}

impl SweepSummary {
    pub fn is_empty(&self) -> bool {
        self.dead_workers.is_empty() && self.requeued.is_empty() && self.exhausted.is_empty()
    }
}

pub struct Coordinator {
    config: CoordinationConfig,
    state: Mutex<CoordinatorState>,
    completion: watch::Sender<Option<AggregateReport>>,
}

impl Coordinator {
    pub fn new(config: CoordinationConfig) -> Result<Arc<Self>> {
        config.validate()?;
        let (completion, _) = watch::channel(None);

        Ok(Arc::new(Self {
            config,
            state: Mutex::new(CoordinatorState::default()),
            completion,
        }))
    }

    pub fn config(&self) -> &CoordinationConfig {
        &self.config
    }

    /// Receives the final report of each job as soon as it is complete.
    pub fn subscribe_completion(&self) -> watch::Receiver<Option<AggregateReport>> {
        self.completion.subscribe()
    }

    pub async fn register_worker(&self, worker_id: WorkerId, now: u64) -> Result<()> {
        let mut state = self.state.lock().await;
        state.registry.register(worker_id, now)
    }

    pub async fn heartbeat(&self, worker_id: &WorkerId, now: u64) -> Result<()> {
        let mut state = self.state.lock().await;
        state.registry.heartbeat(worker_id, now)
    }

    /// Partitions `path` and makes it the current job.
    ///
    /// The chunk target is, in order: `chunk_count`, the configured chunk count, the
    /// number of active workers, or a single chunk when no worker has registered yet.
    pub async fn start_job(&self, path: PathBuf, chunk_count: Option<usize>) -> Result<StartJobResponse> {
        let active_workers = {
            let state = self.state.lock().await;
            Self::ensure_no_running_job(&state)?;
            state.registry.active_count()
        };

        let target = chunk_count
            .or(self.config.chunk_count)
            .unwrap_or(active_workers.max(1));

        // Partitioning touches the disk; keep it off the lock and off the runtime threads.
        let partition_path = path.clone();
        let chunks: Vec<Chunk> =
            tokio::task::spawn_blocking(move || partition_file(&partition_path, target))
                .await
                .map_err(|e| AnalyzerError::Io(std::io::Error::other(e)))??;

        let file_size = chunks.last().map(Chunk::end).unwrap_or_default();
        let chunk_total = chunks.len();

        let mut state = self.state.lock().await;
        Self::ensure_no_running_job(&state)?;

        tracing::info!(
            "Starting job for {} ({} bytes, {} chunks, target {})",
            path.display(),
            file_size,
            chunk_total,
            target
        );

        state.job = Some(Job {
            path: path.clone(),
            file_size,
            ledger: ChunkLedger::new(chunks, self.config.lease_timeout_ms, self.config.max_attempts),
            aggregator: Aggregator::new(),
            report: None,
        });
        self.completion.send_replace(None);

        Ok(StartJobResponse {
            path,
            file_size,
            chunks: chunk_total,
        })
    }

    fn ensure_no_running_job(state: &CoordinatorState) -> Result<()> {
        match &state.job {
            Some(job) if job.report.is_none() => Err(AnalyzerError::JobInProgress),
            _ => Ok(()),
        }
    }

    /// Hands the worker its next chunk.
    ///
    /// A worker that already holds a lease gets the same chunk back, so a lost
    /// response never leaves a worker with two chunks in flight.
    pub async fn request_assignment(&self, worker_id: &WorkerId, now: u64) -> Result<AssignmentResponse> {
        let mut state = self.state.lock().await;
        let CoordinatorState { registry, job } = &mut *state;

        let current_chunk = registry.active(worker_id)?.current_chunk;

        let Some(job) = job.as_mut() else {
            return Ok(AssignmentResponse {
                assignment: None,
                job_complete: false,
            });
        };

        if let Some(chunk_id) = current_chunk
            && let Some(chunk) = job.ledger.get(chunk_id)
            && chunk.status == ChunkStatus::Leased
            && chunk.assigned_to.as_ref() == Some(worker_id)
        {
            tracing::debug!("Re-sending chunk {} to {}", chunk_id, worker_id);
            return Ok(AssignmentResponse {
                assignment: Some(Assignment::for_chunk(chunk, job.path.clone())),
                job_complete: false,
            });
        }

        match job.ledger.assign_next(worker_id, now) {
            Some(chunk) => {
                registry.mark_busy(worker_id, chunk.id);
                tracing::info!(
                    "Assigned chunk {} [{}..{}) to {}",
                    chunk.id,
                    chunk.offset,
                    chunk.end(),
                    worker_id
                );
                Ok(AssignmentResponse {
                    assignment: Some(Assignment::for_chunk(&chunk, job.path.clone())),
                    job_complete: false,
                })
            }
            None => {
                registry.mark_idle(worker_id);
                Ok(AssignmentResponse {
                    assignment: None,
                    job_complete: job.ledger.is_finished(),
                })
            }
        }
    }

    /// Accepts a chunk result from its current lease holder.
    ///
    /// Anything else (late result after reassignment, a second submission, a
    /// submission from a worker declared dead) is acknowledged as stale and dropped.
    /// Metrics that would overflow the job total are rejected with `InvalidInput`.
    pub async fn submit_result(
        &self,
        worker_id: &WorkerId,
        chunk_id: ChunkId,
        metrics: Metrics,
    ) -> Result<SubmitResultResponse> {
        let mut state = self.state.lock().await;
        let CoordinatorState { registry, job } = &mut *state;

        if registry.get(worker_id).is_none() {
            return Err(AnalyzerError::UnknownWorker(worker_id.clone()));
        }

        let stale = SubmitResultResponse {
            accepted: false,
            stale: true,
        };

        let Some(job) = job.as_mut() else {
            tracing::warn!("Submission for chunk {} from {} without a job", chunk_id, worker_id);
            return Ok(stale);
        };

        // The lease stays in place, so the chunk is retried or eventually fails.
        if let Err(err) = job.aggregator.admit(chunk_id, metrics) {
            tracing::warn!("Rejected result from {}: {}", worker_id, err);
            return Err(err);
        }

        match job.ledger.complete(chunk_id, worker_id) {
            Ok(_) => {
                job.aggregator.record_chunk_result(chunk_id, metrics);
                registry.mark_idle(worker_id);
                self.finish_if_done(job);
                Ok(SubmitResultResponse {
                    accepted: true,
                    stale: false,
                })
            }
            Err(err @ AnalyzerError::StaleSubmission { .. }) => {
                tracing::warn!("{}", err);
                Ok(stale)
            }
            Err(err) => Err(err),
        }
    }

    /// One failure-detector pass.
    ///
    /// Declares silent workers dead and releases their chunks right away, then
    /// requeues every lease that expired on its own.
    pub async fn sweep(&self, now: u64) -> SweepSummary {
        let mut state = self.state.lock().await;
        let CoordinatorState { registry, job } = &mut *state;
        let mut summary = SweepSummary::default();
        let mut reclaimed = Vec::new();

        for dead in registry.sweep_dead(now, self.config.dead_threshold_ms) {
            if let Some(chunk_id) = dead.held_chunk
                && let Some(job) = job.as_mut()
                && let Some(released) = job.ledger.release(chunk_id, &dead.worker_id)
            {
                reclaimed.push(released);
            }
            summary.dead_workers.push(dead.worker_id);
        }

        let retention_ms = self.config.dead_threshold_ms.saturating_mul(DEAD_RETENTION_FACTOR);
        let pruned = registry.prune_dead(now, retention_ms);
        if pruned > 0 {
            tracing::debug!("Pruned {} dead workers from the registry", pruned);
        }

        let Some(job) = job.as_mut() else {
            return summary;
        };

        for expired in job.ledger.reclaim_expired(now) {
            registry.release_chunk(&expired.worker_id, expired.chunk_id);
            reclaimed.push(expired);
        }

        for chunk in reclaimed {
            match chunk.outcome {
                ReclaimOutcome::Requeued => summary.requeued.push(chunk.chunk_id),
                ReclaimOutcome::Exhausted => {
                    tracing::error!(
                        "{}",
                        AnalyzerError::ChunkExhausted {
                            chunk_id: chunk.chunk_id,
                            attempts: chunk.attempt_count,
                        }
                    );
                    summary.exhausted.push(chunk.chunk_id);
                }
            }
        }

        self.finish_if_done(job);
        summary
    }

    fn finish_if_done(&self, job: &mut Job) {
        if job.report.is_some() || !job.ledger.is_finished() {
            return;
        }

        match job.aggregator.finalize(&job.ledger, &job.path, job.file_size) {
            Ok(report) => {
                tracing::info!(
                    "Job for {} complete: {} requests, {} errors, {} chunks done, {} failed",
                    report.path.display(),
                    report.metrics.request_count,
                    report.metrics.error_count,
                    report.chunks_done,
                    report.failed_chunks.len()
                );
                for failed in &report.failed_chunks {
                    tracing::warn!(
                        "Bytes [{}..{}) of chunk {} were not analyzed",
                        failed.offset,
                        failed.offset + failed.length,
                        failed.chunk_id
                    );
                }
                job.report = Some(report.clone());
                self.completion.send_replace(Some(report));
            }
            Err(e) => tracing::error!("Failed to finalize job: {}", e),
        }
    }

    /// The final report of the current job.
    pub async fn report(&self) -> Result<AggregateReport> {
        let state = self.state.lock().await;
        let job = state.job.as_ref().ok_or(AnalyzerError::NoActiveJob)?;

        job.report.clone().ok_or(AnalyzerError::JobIncomplete {
            remaining: job.ledger.remaining(),
        })
    }

    pub async fn status(&self) -> StatusResponse {
        let state = self.state.lock().await;

        StatusResponse {
            workers: state.registry.status_counts(),
            chunks: state.job.as_ref().map(|job| job.ledger.status_counts()),
            job_complete: state.job.as_ref().is_some_and(|job| job.report.is_some()),
        }
    }

    /// Snapshot of one chunk of the current job.
    pub async fn chunk(&self, chunk_id: ChunkId) -> Option<Chunk> {
        let state = self.state.lock().await;
        state.job.as_ref()?.ledger.get(chunk_id).cloned()
    }

    /// Snapshot of one registry entry.
    pub async fn worker(&self, worker_id: &WorkerId) -> Option<WorkerEntry> {
        let state = self.state.lock().await;
        state.registry.get(worker_id).cloned()
    }
}
