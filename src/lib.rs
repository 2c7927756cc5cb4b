//! Distributed Log Analyzer Library
//!
//! This library crate defines the modules shared by the two binaries: the
//! coordinator (`main.rs`) and the worker (`bin/worker.rs`).
//!
//! ## Architecture Modules
//! One coordinator splits a large log file into line-aligned chunks and hands
//! them out to a pool of workers that pull work over HTTP:
//!
//! - **`partition`**: Splits a file into contiguous, line-aligned byte ranges.
//! - **`ledger`**: Tracks every chunk's lifecycle (pending, leased, done, failed) with leases and bounded retries.
//! - **`registry`**: Worker membership, heartbeats and dead-worker detection.
//! - **`aggregate`**: Combines per-chunk metrics exactly once into the final report.
//! - **`parser`**: Line parsing and chunk reading on the worker side.
//! - **`coordinator`**: The state machine composing the above, its HTTP handlers and the failure-detector task.
//! - **`worker`**: The coordinator client and the pull loop.
//! - **`config`**, **`error`**, **`telemetry`**: Shared configuration, error type and tracing setup.

pub mod aggregate;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod ledger;
pub mod parser;
pub mod partition;
pub mod registry;
pub mod telemetry;
pub mod worker;
