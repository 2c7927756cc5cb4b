//! Process-wide configuration.
//!
//! Both structs derive `clap::Args` so the binaries can flatten them into their
//! command lines, with an environment variable fallback for every option. The
//! `Default` impls carry the same values for library and test use.

use crate::error::{AnalyzerError, Result};
use clap::Args;
use std::time::Duration;

/// Timing and retry knobs shared by the chunk ledger, the worker registry and the
/// failure detector.
#[derive(Debug, Clone, Args)]
pub struct CoordinationConfig {
    /// Number of chunks per job. Defaults to the number of registered workers.
    #[arg(long, env = "LOG_ANALYZER_CHUNK_COUNT")]
    pub chunk_count: Option<usize>,

    /// How long a worker may hold a chunk before it is re-queued.
    #[arg(long, env = "LOG_ANALYZER_LEASE_TIMEOUT_MS", default_value_t = 30_000)]
    pub lease_timeout_ms: u64,

    /// Expected period between worker heartbeats.
    #[arg(long, env = "LOG_ANALYZER_HEARTBEAT_INTERVAL_MS", default_value_t = 10_000)]
    pub heartbeat_interval_ms: u64,

    /// Silence after which a worker is declared dead.
    #[arg(long, env = "LOG_ANALYZER_DEAD_THRESHOLD_MS", default_value_t = 25_000)]
    pub dead_threshold_ms: u64,

    /// Attempts per chunk before it is marked permanently failed.
    #[arg(long, env = "LOG_ANALYZER_MAX_ATTEMPTS", default_value_t = 3)]
    pub max_attempts: u32,

    /// Period of the dead-worker and lease-expiry sweep.
    #[arg(long, env = "LOG_ANALYZER_SWEEP_INTERVAL_MS", default_value_t = 2_000)]
    pub sweep_interval_ms: u64,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            chunk_count: None,
            lease_timeout_ms: 30_000,
            heartbeat_interval_ms: 10_000,
            dead_threshold_ms: 25_000,
            max_attempts: 3,
            sweep_interval_ms: 2_000,
        }
    }
}

impl CoordinationConfig {
    /// Rejects settings that would cause false reclaims or never terminate.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(AnalyzerError::InvalidInput(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.chunk_count == Some(0) {
            return Err(AnalyzerError::InvalidInput(
                "chunk_count must be positive".to_string(),
            ));
        }
        if self.heartbeat_interval_ms == 0 || self.sweep_interval_ms == 0 {
            return Err(AnalyzerError::InvalidInput(
                "heartbeat and sweep intervals must be positive".to_string(),
            ));
        }
        if self.lease_timeout_ms <= self.heartbeat_interval_ms {
            return Err(AnalyzerError::InvalidInput(format!(
                "lease timeout ({}ms) must exceed heartbeat interval ({}ms)",
                self.lease_timeout_ms, self.heartbeat_interval_ms
            )));
        }
        if self.dead_threshold_ms <= self.heartbeat_interval_ms {
            return Err(AnalyzerError::InvalidInput(format!(
                "dead threshold ({}ms) must exceed heartbeat interval ({}ms)",
                self.dead_threshold_ms, self.heartbeat_interval_ms
            )));
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

/// Worker-side timing and retry settings.
#[derive(Debug, Clone, Args)]
pub struct WorkerConfig {
    /// Period between heartbeats sent to the coordinator.
    #[arg(long, env = "LOG_ANALYZER_HEARTBEAT_INTERVAL_MS", default_value_t = 10_000)]
    pub heartbeat_interval_ms: u64,

    /// Wait between assignment requests while no chunk is pending.
    #[arg(long, env = "LOG_ANALYZER_POLL_INTERVAL_MS", default_value_t = 500)]
    pub poll_interval_ms: u64,

    /// Per-request timeout for calls to the coordinator.
    #[arg(long, env = "LOG_ANALYZER_REQUEST_TIMEOUT_MS", default_value_t = 2_000)]
    pub request_timeout_ms: u64,

    /// Attempts for each coordinator call before giving up.
    #[arg(long, env = "LOG_ANALYZER_SUBMIT_ATTEMPTS", default_value_t = 5)]
    pub submit_attempts: usize,

    /// Initial backoff between attempts, doubled each retry.
    #[arg(long, env = "LOG_ANALYZER_RETRY_BACKOFF_MS", default_value_t = 150)]
    pub retry_backoff_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 10_000,
            poll_interval_ms: 500,
            request_timeout_ms: 2_000,
            submit_attempts: 5,
            retry_backoff_ms: 150,
        }
    }
}

impl WorkerConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CoordinationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_lease_must_exceed_heartbeat() {
        let config = CoordinationConfig {
            lease_timeout_ms: 5_000,
            heartbeat_interval_ms: 5_000,
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidInput(_)));
        assert!(err.to_string().contains("lease timeout"));
    }

    #[test]
    fn test_zero_attempts_and_zero_chunks_rejected() {
        let config = CoordinationConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CoordinationConfig {
            chunk_count: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dead_threshold_must_exceed_heartbeat() {
        let config = CoordinationConfig {
            dead_threshold_ms: 1_000,
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }
}
