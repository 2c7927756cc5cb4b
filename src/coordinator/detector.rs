use super::coordinator::Coordinator;
use crate::ledger::types::now_ms;

use std::sync::Arc;
use tokio::task::JoinHandle;

/// Runs the dead-worker and lease-expiry sweep on the configured interval.
pub fn spawn_failure_detector(coordinator: Arc<Coordinator>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(coordinator.config().sweep_interval());
        tracing::info!(
            "Failure detector running every {:?} (dead after {}ms, lease {}ms)",
            coordinator.config().sweep_interval(),
            coordinator.config().dead_threshold_ms,
            coordinator.config().lease_timeout_ms
        );

        loop {
            interval.tick().await;

            let summary = coordinator.sweep(now_ms()).await;
            if !summary.is_empty() {
                tracing::info!(
                    "Sweep: {} dead workers, requeued {:?}, exhausted {:?}",
                    summary.dead_workers.len(),
                    summary.requeued,
                    summary.exhausted
                );
            }
        }
    })
}
