//! Chunk Ledger Module
//!
//! Lease-based scheduling of file chunks.
//!
//! ## Architecture Overview
//! 1. **Partitioning**: the `partition` module produces the chunk list once per file.
//! 2. **Leasing**: a worker asking for work receives the oldest pending chunk together
//!    with a lease deadline.
//! 3. **Completion**: a result is accepted only from the worker that holds the lease.
//! 4. **Recovery**: expired leases and leases held by dead workers are requeued, up to
//!    `max_attempts`, after which the chunk is permanently `Failed`.
//!
//! ## Submodules
//! - **`ledger`**: the chunk table and its state transitions.
//! - **`types`**: chunk ids, statuses and reclaim records.

pub mod ledger;
pub mod types;
