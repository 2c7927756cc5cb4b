//! File Partitioning
//!
//! Computes the chunk list for a job: contiguous, non-overlapping byte ranges that
//! cover the whole file and never split a line between two chunks.

pub mod partitioner;
