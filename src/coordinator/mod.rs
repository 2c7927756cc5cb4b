//! Coordinator Module
//!
//! Composes the worker registry, chunk ledger and aggregator behind an HTTP/JSON
//! request boundary.
//!
//! ## Architecture Overview
//! The coordinator follows a **pull-based** model with **lease** management:
//! 1. **Registration**: workers announce themselves and then heartbeat on a fixed period.
//! 2. **Job start**: the file is partitioned once into line-aligned chunks.
//! 3. **Assignment**: an idle worker asking for work receives the oldest pending chunk under a lease.
//! 4. **Submission**: results are accepted only from the lease holder and aggregated by chunk id.
//! 5. **Recovery**: a periodic sweep declares silent workers dead, releases their chunks,
//!    and requeues expired leases until a chunk runs out of attempts.
//!
//! ## Submodules
//! - **`coordinator`**: the lock-guarded state machine.
//! - **`handlers`**: Axum handlers and the router.
//! - **`detector`**: the periodic failure-detector task.
//! - **`protocol`**: request/response bodies and endpoint paths.

pub mod coordinator;
pub mod detector;
pub mod handlers;
pub mod protocol;
