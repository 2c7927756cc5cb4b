//! Aggregation Module Tests
//!
//! ## Test Scopes
//! - **Metrics**: additive merging and averages.
//! - **Aggregator**: chunk-keyed idempotency and report construction.

#[cfg(test)]
mod tests {
    use crate::aggregate::aggregator::Aggregator;
    use crate::aggregate::types::Metrics;
    use crate::error::AnalyzerError;
    use crate::ledger::ledger::ChunkLedger;
    use crate::ledger::types::{Chunk, ChunkId};
    use crate::registry::types::WorkerId;
    use std::path::Path;

    fn metrics(errors: u64, total_ms: u64, requests: u64) -> Metrics {
        Metrics {
            error_count: errors,
            total_response_time_ms: total_ms,
            request_count: requests,
        }
    }

    // ============================================================
    // METRICS TESTS
    // ============================================================

    #[test]
    fn test_metrics_merge_is_order_independent() {
        let a = metrics(1, 100, 2);
        let b = metrics(0, 50, 1);
        let c = metrics(3, 0, 0);

        assert_eq!((a + b) + c, a + (b + c));
        assert_eq!(a + b, b + a);
        assert_eq!(vec![a, b, c].into_iter().sum::<Metrics>(), metrics(4, 150, 3));
    }

    #[test]
    fn test_average_response_time() {
        assert_eq!(metrics(0, 300, 3).average_response_time_ms(), Some(100.0));
        assert_eq!(Metrics::default().average_response_time_ms(), None);
    }

    #[test]
    fn test_metrics_checked_add_detects_overflow_and_add_saturates() {
        let big = metrics(0, u64::MAX, 1);
        let small = metrics(1, 1, 1);

        assert_eq!(big.checked_add(small), None);
        assert_eq!(small.checked_add(small), Some(metrics(2, 2, 2)));
        assert_eq!(big + small, metrics(1, u64::MAX, 2));
    }

    // ============================================================
    // AGGREGATOR TESTS
    // ============================================================

    #[test]
    fn test_duplicate_result_for_chunk_is_ignored() {
        let mut aggregator = Aggregator::new();

        assert!(aggregator.record_chunk_result(ChunkId(2), metrics(1, 10, 1)));
        assert!(!aggregator.record_chunk_result(ChunkId(2), metrics(9, 90, 9)));

        assert_eq!(aggregator.recorded(), 1);
        assert_eq!(aggregator.running_total(), metrics(1, 10, 1));
    }

    #[test]
    fn test_admit_rejects_result_that_would_overflow_total() {
        let mut aggregator = Aggregator::new();
        aggregator.admit(ChunkId(0), metrics(0, u64::MAX, 1)).unwrap();
        aggregator.record_chunk_result(ChunkId(0), metrics(0, u64::MAX, 1));

        let result = aggregator.admit(ChunkId(1), metrics(0, 1, 1));

        assert!(matches!(result, Err(AnalyzerError::InvalidInput(_))));
        assert!(aggregator.admit(ChunkId(1), metrics(5, 0, 0)).is_ok());
        assert_eq!(aggregator.running_total(), metrics(0, u64::MAX, 1));
    }

    #[test]
    fn test_finalize_before_all_chunks_terminal_fails() {
        let ledger = ChunkLedger::new(vec![Chunk::new(ChunkId(0), 0, 10)], 1_000, 3);
        let aggregator = Aggregator::new();

        let result = aggregator.finalize(&ledger, Path::new("app.log"), 10);

        assert!(matches!(result, Err(AnalyzerError::JobIncomplete { remaining: 1 })));
    }

    #[test]
    fn test_finalize_sums_done_chunks_and_lists_failed_ranges() {
        // ARRANGE: chunk 0 completes, chunk 1 exhausts its single attempt
        let chunks = vec![Chunk::new(ChunkId(0), 0, 40), Chunk::new(ChunkId(1), 40, 60)];
        let mut ledger = ChunkLedger::new(chunks, 1_000, 1);
        let mut aggregator = Aggregator::new();
        let w1 = WorkerId::from("w1");
        let w2 = WorkerId::from("w2");

        ledger.assign_next(&w1, 0);
        ledger.assign_next(&w2, 0);
        ledger.complete(ChunkId(0), &w1).unwrap();
        aggregator.record_chunk_result(ChunkId(0), metrics(2, 500, 5));
        ledger.reclaim_expired(2_000);

        // ACT
        let report = aggregator.finalize(&ledger, Path::new("app.log"), 100).unwrap();

        // ASSERT
        assert_eq!(report.metrics, metrics(2, 500, 5));
        assert_eq!(report.average_response_time_ms, Some(100.0));
        assert_eq!(report.chunks_total, 2);
        assert_eq!(report.chunks_done, 1);
        assert_eq!(report.failed_chunks.len(), 1);
        assert_eq!(report.failed_chunks[0].chunk_id, ChunkId(1));
        assert_eq!(report.failed_chunks[0].offset, 40);
        assert_eq!(report.failed_chunks[0].length, 60);
        assert_eq!(report.failed_chunks[0].attempts, 1);
        assert_eq!(report.failed_bytes, 60);
        assert!(!report.is_complete_success());
    }

    #[test]
    fn test_result_for_chunk_not_done_is_not_counted() {
        // A result that slipped in for a chunk the ledger failed must not be summed
        let mut ledger = ChunkLedger::new(vec![Chunk::new(ChunkId(0), 0, 10)], 1_000, 1);
        let mut aggregator = Aggregator::new();
        ledger.assign_next(&WorkerId::from("w1"), 0);
        ledger.reclaim_expired(5_000);
        aggregator.record_chunk_result(ChunkId(0), metrics(1, 1, 1));

        let report = aggregator.finalize(&ledger, Path::new("app.log"), 10).unwrap();

        assert_eq!(report.metrics, Metrics::default());
        assert_eq!(report.failed_chunks.len(), 1);
    }
}
