//! Chunk Ledger & Scheduler
//!
//! Owns the state of every chunk of the current job and hands them out under
//! time-bounded leases.
//!
//! ## Responsibilities
//! - **Scheduling**: the lowest-numbered `Pending` chunk goes to the next worker that asks.
//! - **Leasing**: a leased chunk belongs to one worker until it completes or the lease expires.
//! - **Acceptance**: only the current lease holder may complete a chunk; anything else is stale.
//! - **Reclaiming**: expired or orphaned leases go back to `Pending` until attempts run out.
//!
//! The ledger is not synchronised itself. The coordinator keeps it behind the same
//! lock as the worker registry so every transition is applied atomically.

use super::types::*;
use crate::error::{AnalyzerError, Result};
use crate::registry::types::WorkerId;

use std::collections::BTreeMap;

pub struct ChunkLedger {
    chunks: BTreeMap<ChunkId, Chunk>,
    lease_timeout_ms: u64,
    max_attempts: u32,
}

impl ChunkLedger {
    pub fn new(chunks: Vec<Chunk>, lease_timeout_ms: u64, max_attempts: u32) -> Self {
        Self {
            chunks: chunks.into_iter().map(|chunk| (chunk.id, chunk)).collect(),
            lease_timeout_ms,
            max_attempts,
        }
    }

    /// Leases the oldest pending chunk to `worker_id`.
    ///
    /// Returns `None` when nothing is pending; the caller treats the worker as idle.
    pub fn assign_next(&mut self, worker_id: &WorkerId, now: u64) -> Option<Chunk> {
        let chunk = self
            .chunks
            .values_mut()
            .find(|chunk| chunk.status == ChunkStatus::Pending)?;

        chunk.status = ChunkStatus::Leased;
        chunk.assigned_to = Some(worker_id.clone());
        chunk.lease_expires = Some(now.saturating_add(self.lease_timeout_ms));

        tracing::debug!(
            "Leased chunk {} [{}..{}) to {} (attempt {})",
            chunk.id,
            chunk.offset,
            chunk.end(),
            worker_id,
            chunk.attempt_count + 1
        );

        Some(chunk.clone())
    }

    /// Accepts a result from the current lease holder.
    ///
    /// Returns `StaleSubmission` when the chunk is unknown, no longer leased, or
    /// leased to someone else. The ledger is left untouched in that case.
    pub fn complete(&mut self, chunk_id: ChunkId, worker_id: &WorkerId) -> Result<Chunk> {
        let stale = || AnalyzerError::StaleSubmission {
            chunk_id,
            worker_id: worker_id.clone(),
        };

        let chunk = self.chunks.get_mut(&chunk_id).ok_or_else(stale)?;

        if chunk.status != ChunkStatus::Leased || chunk.assigned_to.as_ref() != Some(worker_id) {
            return Err(stale());
        }

        chunk.status = ChunkStatus::Done;
        chunk.lease_expires = None;

        tracing::info!("Chunk {} completed by {}", chunk_id, worker_id);

        Ok(chunk.clone())
    }

    /// Re-queues every lease that expired strictly before `now`.
    pub fn reclaim_expired(&mut self, now: u64) -> Vec<Reclaimed> {
        let expired: Vec<ChunkId> = self
            .chunks
            .values()
            .filter(|chunk| {
                chunk.status == ChunkStatus::Leased
                    && chunk.lease_expires.is_some_and(|expiry| expiry < now)
            })
            .map(|chunk| chunk.id)
            .collect();

        expired
            .into_iter()
            .filter_map(|chunk_id| {
                tracing::warn!("Lease on chunk {} expired", chunk_id);
                self.take_back(chunk_id)
            })
            .collect()
    }

    /// Takes a chunk away from a worker that was declared dead.
    ///
    /// Does nothing unless `worker_id` still holds the lease.
    pub fn release(&mut self, chunk_id: ChunkId, worker_id: &WorkerId) -> Option<Reclaimed> {
        let chunk = self.chunks.get(&chunk_id)?;
        if chunk.status != ChunkStatus::Leased || chunk.assigned_to.as_ref() != Some(worker_id) {
            return None;
        }

        tracing::warn!("Releasing chunk {} held by dead worker {}", chunk_id, worker_id);
        self.take_back(chunk_id)
    }

    /// Ends the current lease as a failed attempt.
    fn take_back(&mut self, chunk_id: ChunkId) -> Option<Reclaimed> {
        let max_attempts = self.max_attempts;
        let chunk = self.chunks.get_mut(&chunk_id)?;
        let worker_id = chunk.assigned_to.take()?;

        chunk.attempt_count += 1;
        chunk.lease_expires = None;

        let outcome = if chunk.attempt_count >= max_attempts {
            chunk.status = ChunkStatus::Failed;
            ReclaimOutcome::Exhausted
        } else {
            chunk.status = ChunkStatus::Pending;
            ReclaimOutcome::Requeued
        };

        Some(Reclaimed {
            chunk_id,
            worker_id,
            attempt_count: chunk.attempt_count,
            outcome,
        })
    }

    pub fn get(&self, chunk_id: ChunkId) -> Option<&Chunk> {
        self.chunks.get(&chunk_id)
    }

    /// All chunks in file order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn failed_chunks(&self) -> Vec<Chunk> {
        self.chunks
            .values()
            .filter(|chunk| chunk.status == ChunkStatus::Failed)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunks that are still `Pending` or `Leased`.
    pub fn remaining(&self) -> usize {
        self.chunks
            .values()
            .filter(|chunk| !chunk.status.is_terminal())
            .count()
    }

    /// True once every chunk is `Done` or `Failed`.
    pub fn is_finished(&self) -> bool {
        self.remaining() == 0
    }

    pub fn status_counts(&self) -> ChunkStatusCounts {
        let mut counts = ChunkStatusCounts::default();

        for chunk in self.chunks.values() {
            match chunk.status {
                ChunkStatus::Pending => counts.pending += 1,
                ChunkStatus::Leased => counts.leased += 1,
                ChunkStatus::Done => counts.done += 1,
                ChunkStatus::Failed => counts.failed += 1,
            }
        }

        counts
    }
}
