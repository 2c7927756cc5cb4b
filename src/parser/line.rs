use crate::aggregate::types::Metrics;

/// Turns one log line into a metric delta.
///
/// Implementations must never fail: a line they cannot make sense of is either
/// skipped or counted as an error, but processing of the chunk continues.
pub trait LineParser: Send + Sync {
    fn parse_line(&self, line: &str, metrics: &mut Metrics);
}

/// Parser for `<timestamp> <LEVEL> <message...>` request logs.
///
/// - lines with fewer than four whitespace-separated fields are ignored
/// - `ERROR` lines count as errors
/// - lines containing `processed in` contribute their trailing `<n>ms` as a request
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseTimeParser;

const REQUEST_MARKER: &str = "processed in";

impl LineParser for ResponseTimeParser {
    fn parse_line(&self, line: &str, metrics: &mut Metrics) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            return;
        }

        if fields[1] == "ERROR" {
            metrics.error_count = metrics.error_count.saturating_add(1);
            return;
        }

        if !line.contains(REQUEST_MARKER) {
            return;
        }

        let last = fields[fields.len() - 1];
        let total = last
            .trim_end_matches("ms")
            .parse::<u64>()
            .ok()
            .and_then(|duration_ms| metrics.total_response_time_ms.checked_add(duration_ms));

        match total {
            Some(total) => {
                metrics.total_response_time_ms = total;
                metrics.request_count = metrics.request_count.saturating_add(1);
            }
            // Unparseable, or too large to add to the running total.
            None => {
                tracing::debug!("Malformed response time '{}'", last);
                metrics.error_count = metrics.error_count.saturating_add(1);
            }
        }
    }
}
