//! Metrics and observability utilities
//!
//! Prometheus metrics through the `metrics` facade. Nothing is recorded
//! unless a recorder is installed, so the helpers are safe to call from
//! tests.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::{Duration, Instant};

/// Metrics prefix for all CardForge metrics
pub const METRICS_PREFIX: &str = "cardforge";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, // 1ms
    0.005, // 5ms
    0.010, // 10ms
    0.025, // 25ms
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
    10.00, // 10s
    30.00, // 30s
    60.00, // 60s
];

/// Buckets for generator calls, which take seconds rather than milliseconds
pub const GENERATION_BUCKETS: &[f64] = &[
    0.250, 0.500, 1.000, 2.000, 5.000, 10.00, 20.00, 30.00, 45.00, 60.00, 90.00,
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_generations_total", METRICS_PREFIX),
        Unit::Count,
        "Generation attempts by outcome"
    );

    describe_histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Proposal generator latency in seconds"
    );

    describe_counter!(
        format!("{}_proposals_generated_total", METRICS_PREFIX),
        Unit::Count,
        "Proposals returned by successful generations"
    );

    describe_counter!(
        format!("{}_proposal_decisions_total", METRICS_PREFIX),
        Unit::Count,
        "Proposal decisions recorded, by outcome"
    );

    describe_counter!(
        format!("{}_flashcards_created_total", METRICS_PREFIX),
        Unit::Count,
        "Flashcards created, by source"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record one generation attempt.
///
/// `error_code` is `None` for a success.
pub fn record_generation(duration: Duration, model: &str, proposals: usize, error_code: Option<&str>) {
    let outcome = error_code.unwrap_or("success").to_string();

    counter!(
        format!("{}_generations_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "outcome" => outcome
    )
    .increment(1);

    histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        "model" => model.to_string()
    )
    .record(duration.as_secs_f64());

    if error_code.is_none() {
        counter!(
            format!("{}_proposals_generated_total", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .increment(proposals as u64);
    }
}

/// Record decisions applied to one generation
pub fn record_decisions(unedited: usize, edited: usize, rejected: usize) {
    for (outcome, count) in [
        ("accepted-unedited", unedited),
        ("accepted-edited", edited),
        ("rejected", rejected),
    ] {
        if count > 0 {
            counter!(
                format!("{}_proposal_decisions_total", METRICS_PREFIX),
                "outcome" => outcome
            )
            .increment(count as u64);
        }
    }
}

/// Record created flashcards
pub fn record_flashcards_created(source: &str, count: usize) {
    if count == 0 {
        return;
    }

    counter!(
        format!("{}_flashcards_created_total", METRICS_PREFIX),
        "source" => source.to_string()
    )
    .increment(count as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_sorted(buckets: &[f64]) {
        let mut prev = 0.0;
        for &bucket in buckets {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_buckets_sorted() {
        assert_sorted(LATENCY_BUCKETS);
        assert_sorted(GENERATION_BUCKETS);
    }

    #[test]
    fn test_generation_buckets_cover_default_timeout() {
        assert!(GENERATION_BUCKETS.contains(&60.00));
    }

    #[test]
    fn test_helpers_without_recorder() {
        RequestMetrics::start("GET", "/api/flashcards").finish(200);
        record_generation(Duration::from_millis(120), "mock-generator", 3, None);
        record_generation(Duration::from_secs(60), "mock-generator", 0, Some("TIMEOUT"));
        record_decisions(2, 1, 0);
        record_flashcards_created("manual", 0);
    }
}
