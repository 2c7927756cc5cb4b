//! Aggregation Module
//!
//! Merges per-chunk metrics into the job's final report.
//!
//! ## Submodules
//! - **`aggregator`**: idempotent, chunk-keyed result store and report builder.
//! - **`types`**: the additive `Metrics` type and the report structures.

pub mod aggregator;
pub mod types;

#[cfg(test)]
mod tests;
