//! Worker Registry & Failure Detection
//!
//! Keeps the coordinator's view of the worker pool.
//!
//! ## Core Mechanisms
//! - **Registration**: Each worker id may be active at most once. Re-registering a live id is rejected.
//! - **Heartbeats**: Workers report liveness on a fixed period, independent of the work they are doing.
//! - **Failure Detection**: A periodic sweep marks silent workers `Dead` and hands back the chunk they held.
//!   A dead id is never revived by a heartbeat; the worker has to register again.

pub mod registry;
pub mod types;
