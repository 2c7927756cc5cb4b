//! Log Line Parsing
//!
//! The line-to-metrics rule is pluggable through [`line::LineParser`]; workers only
//! depend on the trait. [`line::ResponseTimeParser`] is the rule used by the worker
//! binary.

pub mod line;
pub mod reader;
