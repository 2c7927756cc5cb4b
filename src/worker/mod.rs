//! Worker Module
//!
//! The processing side of the cluster. A worker process registers with the
//! coordinator, keeps heartbeating, and repeatedly pulls a chunk, parses it and
//! submits the metrics until the job is complete.
//!
//! ## Submodules
//! - **`client`**: HTTP client for the coordinator endpoints, with retry and backoff.
//! - **`worker`**: The pull loop, the heartbeat task and re-registration after being declared dead.

pub mod client;
pub mod worker;
