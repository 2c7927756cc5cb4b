//! Worker Loop
//!
//! A worker pulls one chunk at a time from the coordinator, runs the line parser
//! over its byte range and submits the resulting metrics. Heartbeats run in a
//! separate task on a fixed period, independent of whether a chunk is in flight.
//!
//! ## States
//! `Unregistered -> Registered -> Idle <-> Busy -> (Idle | Dead)`
//!
//! When the coordinator stops recognising the worker (it was declared dead), the
//! current work is abandoned and the worker registers again under a fresh identity.

use super::client::{CoordinatorClient, is_unknown_worker};
use crate::config::WorkerConfig;
use crate::coordinator::protocol::Assignment;
use crate::parser::line::LineParser;
use crate::parser::reader::process_chunk;
use crate::registry::types::WorkerId;

use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    Unregistered,
    Registered,
    Idle,
    Busy,
    Dead,
}

/// Counters reported when the worker loop exits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub chunks_processed: usize,
    pub stale_submissions: usize,
    /// Submissions given up on after every retry failed.
    pub abandoned_submissions: usize,
    pub reregistrations: usize,
}

pub struct Worker<P> {
    base_id: WorkerId,
    client: Arc<CoordinatorClient>,
    parser: Arc<P>,
    config: WorkerConfig,
}

impl<P: LineParser + 'static> Worker<P> {
    pub fn new(base_id: WorkerId, client: Arc<CoordinatorClient>, parser: Arc<P>, config: WorkerConfig) -> Self {
        Self {
            base_id,
            client,
            parser,
            config,
        }
    }

    /// Runs until the coordinator reports the job complete.
    pub async fn run(&self) -> Result<WorkerSummary> {
        let mut summary = WorkerSummary::default();
        let mut identity = self.base_id.clone();
        let mut phase = WorkerPhase::Unregistered;

        self.register(&identity).await?;
        tracing::info!("Worker {} registered with {}", identity, self.client.base_url());
        phase = self.transition(phase, WorkerPhase::Registered);

        let mut declared_dead = Arc::new(AtomicBool::new(false));
        let mut heartbeat = self.spawn_heartbeat(identity.clone(), declared_dead.clone());
        phase = self.transition(phase, WorkerPhase::Idle);

        loop {
            if declared_dead.load(Ordering::SeqCst) {
                phase = self.transition(phase, WorkerPhase::Dead);
            }

            if phase == WorkerPhase::Dead {
                heartbeat.abort();

                identity = self.base_id.fresh_from();
                tracing::warn!("Coordinator declared us dead; re-registering as {}", identity);
                self.register(&identity).await?;
                summary.reregistrations += 1;

                declared_dead = Arc::new(AtomicBool::new(false));
                heartbeat = self.spawn_heartbeat(identity.clone(), declared_dead.clone());
                phase = self.transition(WorkerPhase::Registered, WorkerPhase::Idle);
            }

            let response = match self.client.request_assignment(&identity).await {
                Ok(response) => response,
                Err(e) if is_unknown_worker(&e) => {
                    phase = self.transition(phase, WorkerPhase::Dead);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Assignment request failed: {}", e);
                    tokio::time::sleep(self.config.poll_interval()).await;
                    continue;
                }
            };

            if response.job_complete {
                tracing::info!("Job complete, worker {} stopping", identity);
                break;
            }

            let Some(assignment) = response.assignment else {
                tokio::time::sleep(self.config.poll_interval()).await;
                continue;
            };

            phase = self.transition(phase, WorkerPhase::Busy);

            let metrics = match self.process(&assignment).await {
                Ok(metrics) => metrics,
                Err(e) => {
                    // The lease runs out and the chunk is retried.
                    tracing::error!("Failed to process chunk {}: {}", assignment.chunk_id, e);
                    phase = self.transition(phase, WorkerPhase::Idle);
                    tokio::time::sleep(self.config.poll_interval()).await;
                    continue;
                }
            };

            match self.client.submit(&identity, assignment.chunk_id, metrics).await {
                Ok(reply) if reply.accepted => {
                    summary.chunks_processed += 1;
                    tracing::info!(
                        "Worker {} submitted chunk {} ({} requests, {} errors)",
                        identity,
                        assignment.chunk_id,
                        metrics.request_count,
                        metrics.error_count
                    );
                }
                Ok(_) => {
                    summary.stale_submissions += 1;
                    tracing::warn!("Result for chunk {} was stale", assignment.chunk_id);
                }
                Err(e) if is_unknown_worker(&e) => {
                    phase = self.transition(phase, WorkerPhase::Dead);
                    continue;
                }
                Err(e) => {
                    summary.abandoned_submissions += 1;
                    tracing::error!(
                        "Giving up on submitting chunk {}: {}",
                        assignment.chunk_id,
                        e
                    );
                }
            }

            phase = self.transition(phase, WorkerPhase::Idle);
        }

        heartbeat.abort();
        Ok(summary)
    }

    /// Keeps trying while the coordinator is unreachable; an HTTP rejection is returned.
    async fn register(&self, identity: &WorkerId) -> Result<()> {
        loop {
            match self.client.register(identity).await {
                Ok(()) => return Ok(()),
                Err(e) if e.downcast_ref::<reqwest::Error>().is_some() => {
                    tracing::warn!("Coordinator unreachable, retrying registration: {}", e);
                    tokio::time::sleep(self.config.poll_interval()).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn transition(&self, from: WorkerPhase, to: WorkerPhase) -> WorkerPhase {
        if from != to {
            tracing::debug!("Worker {}: {:?} -> {:?}", self.base_id, from, to);
        }
        to
    }

    async fn process(&self, assignment: &Assignment) -> Result<crate::aggregate::types::Metrics> {
        let parser = self.parser.clone();
        let assignment = assignment.clone();

        let metrics = tokio::task::spawn_blocking(move || {
            process_chunk(&assignment.path, assignment.offset, assignment.length, parser.as_ref())
        })
        .await??;

        Ok(metrics)
    }

    /// Sends heartbeats until the coordinator rejects this identity.
    fn spawn_heartbeat(&self, identity: WorkerId, declared_dead: Arc<AtomicBool>) -> JoinHandle<()> {
        let client = self.client.clone();
        let period = self.config.heartbeat_interval();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);

            loop {
                interval.tick().await;

                match client.heartbeat(&identity).await {
                    Ok(()) => tracing::trace!("Heartbeat sent for {}", identity),
                    Err(e) if is_unknown_worker(&e) => {
                        tracing::warn!("Heartbeat for {} rejected: declared dead", identity);
                        declared_dead.store(true, Ordering::SeqCst);
                        break;
                    }
                    Err(e) => tracing::warn!("Heartbeat for {} failed: {}", identity, e),
                }
            }
        })
    }
}
