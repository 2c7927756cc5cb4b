//! Worker Registry
//!
//! Tracks identity, liveness and the current chunk of every worker that ever
//! registered. Dead entries are kept for a while so a zombie heartbeat can be told
//! apart from a worker that never existed, then pruned.

use super::types::*;
use crate::error::{AnalyzerError, Result};
use crate::ledger::types::ChunkId;

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct WorkerRegistry {
    workers: HashMap<WorkerId, WorkerEntry>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a worker as `Idle`.
    ///
    /// Fails with `DuplicateWorker` while an entry with the same id is active. A
    /// `Dead` entry is replaced by a clean one: the old lease was already released
    /// when the worker was declared dead, so nothing can be resumed.
    pub fn register(&mut self, worker_id: WorkerId, now: u64) -> Result<()> {
        if worker_id.0.trim().is_empty() {
            return Err(AnalyzerError::InvalidInput(
                "worker_id must be non-empty".to_string(),
            ));
        }

        if let Some(existing) = self.workers.get(&worker_id)
            && existing.status.is_active()
        {
            return Err(AnalyzerError::DuplicateWorker(worker_id));
        }

        tracing::info!("Worker {} registered", worker_id);

        self.workers.insert(
            worker_id.clone(),
            WorkerEntry {
                id: worker_id,
                status: WorkerStatus::Idle,
                last_heartbeat_at: now,
                current_chunk: None,
            },
        );

        Ok(())
    }

    /// Records a liveness signal. Dead and unknown workers are rejected alike.
    pub fn heartbeat(&mut self, worker_id: &WorkerId, now: u64) -> Result<()> {
        match self.workers.get_mut(worker_id) {
            Some(entry) if entry.status.is_active() => {
                entry.last_heartbeat_at = now;
                tracing::trace!("Heartbeat from {}", worker_id);
                Ok(())
            }
            Some(_) => {
                tracing::warn!("Rejected heartbeat from dead worker {}", worker_id);
                Err(AnalyzerError::UnknownWorker(worker_id.clone()))
            }
            None => Err(AnalyzerError::UnknownWorker(worker_id.clone())),
        }
    }

    /// Returns the entry of an active worker.
    pub fn active(&self, worker_id: &WorkerId) -> Result<&WorkerEntry> {
        self.workers
            .get(worker_id)
            .filter(|entry| entry.status.is_active())
            .ok_or_else(|| AnalyzerError::UnknownWorker(worker_id.clone()))
    }

    pub fn get(&self, worker_id: &WorkerId) -> Option<&WorkerEntry> {
        self.workers.get(worker_id)
    }

    pub fn mark_busy(&mut self, worker_id: &WorkerId, chunk_id: ChunkId) {
        if let Some(entry) = self.workers.get_mut(worker_id) {
            entry.status = WorkerStatus::Busy;
            entry.current_chunk = Some(chunk_id);
        }
    }

    pub fn mark_idle(&mut self, worker_id: &WorkerId) {
        if let Some(entry) = self.workers.get_mut(worker_id)
            && entry.status.is_active()
        {
            entry.status = WorkerStatus::Idle;
            entry.current_chunk = None;
        }
    }

    /// Drops the worker's hold on `chunk_id` if it still has it.
    ///
    /// Called when a lease expires underneath a live worker; the worker keeps its
    /// identity and becomes `Idle`.
    pub fn release_chunk(&mut self, worker_id: &WorkerId, chunk_id: ChunkId) {
        if let Some(entry) = self.workers.get_mut(worker_id)
            && entry.current_chunk == Some(chunk_id)
        {
            entry.current_chunk = None;
            if entry.status == WorkerStatus::Busy {
                entry.status = WorkerStatus::Idle;
            }
        }
    }

    /// Marks every active worker silent for longer than `dead_threshold_ms` as `Dead`.
    ///
    /// Returns the newly dead workers together with the chunk each one held so the
    /// caller can release it immediately instead of waiting for lease expiry.
    pub fn sweep_dead(&mut self, now: u64, dead_threshold_ms: u64) -> Vec<DeadWorker> {
        let mut dead = Vec::new();

        for entry in self.workers.values_mut() {
            if !entry.status.is_active() {
                continue;
            }

            let silent_for_ms = now.saturating_sub(entry.last_heartbeat_at);
            if silent_for_ms > dead_threshold_ms {
                tracing::warn!(
                    "Worker {} declared DEAD (no heartbeat for {}ms)",
                    entry.id,
                    silent_for_ms
                );

                entry.status = WorkerStatus::Dead;
                dead.push(DeadWorker {
                    worker_id: entry.id.clone(),
                    held_chunk: entry.current_chunk.take(),
                    silent_for_ms,
                });
            }
        }

        dead
    }

    /// Forgets dead workers silent for longer than `retention_ms`.
    ///
    /// Returns how many entries were removed.
    pub fn prune_dead(&mut self, now: u64, retention_ms: u64) -> usize {
        let before = self.workers.len();

        self.workers.retain(|_, entry| {
            entry.status != WorkerStatus::Dead
                || now.saturating_sub(entry.last_heartbeat_at) <= retention_ms
        });

        before - self.workers.len()
    }

    pub fn active_count(&self) -> usize {
        self.workers
            .values()
            .filter(|entry| entry.status.is_active())
            .count()
    }

    pub fn status_counts(&self) -> WorkerStatusCounts {
        let mut counts = WorkerStatusCounts::default();

        for entry in self.workers.values() {
            match entry.status {
                WorkerStatus::Registered => counts.registered += 1,
                WorkerStatus::Idle => counts.idle += 1,
                WorkerStatus::Busy => counts.busy += 1,
                WorkerStatus::Dead => counts.dead += 1,
            }
        }

        counts
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}
