//! Metrics and observability utilities
//!
//! Provides Prometheus metrics for the gateway and each pipeline stage
//! with standardized naming conventions.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all rSearch metrics
pub const METRICS_PREFIX: &str = "rsearch";

/// Histogram buckets for provider round trips (in seconds)
pub const UPSTREAM_BUCKETS: &[f64] = &[
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.000,  // 2s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
    60.00,  // 60s - long reasoning streams
    120.0,  // 2m
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
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

    // Search metrics
    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of provider searches"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Provider search latency in seconds"
    );

    describe_gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of normalized results from the last search"
    );

    // Refinement metrics
    describe_counter!(
        format!("{}_refinements_total", METRICS_PREFIX),
        Unit::Count,
        "Total query refinement attempts"
    );

    describe_histogram!(
        format!("{}_refinement_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Query refinement latency in seconds"
    );

    // Synthesis metrics
    describe_counter!(
        format!("{}_syntheses_total", METRICS_PREFIX),
        Unit::Count,
        "Total answer synthesis streams"
    );

    describe_histogram!(
        format!("{}_synthesis_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Answer synthesis stream duration in seconds"
    );

    describe_counter!(
        format!("{}_stream_chunks_total", METRICS_PREFIX),
        Unit::Count,
        "Streamed chunks by channel"
    );

    describe_counter!(
        format!("{}_stream_records_skipped_total", METRICS_PREFIX),
        Unit::Count,
        "Malformed stream records skipped"
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

/// Helper to record search metrics
pub fn record_search(duration_secs: f64, mode: &str, result_count: usize) {
    counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .record(duration_secs);

    gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .set(result_count as f64);
}

/// Helper to record refinement metrics
pub fn record_refinement(duration_secs: f64, model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_refinements_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_refinement_duration_seconds", METRICS_PREFIX),
        "model" => model.to_string()
    )
    .record(duration_secs);
}

/// Helper to record a finished (or failed) synthesis stream
pub fn record_synthesis(duration_secs: f64, outcome: &str) {
    counter!(
        format!("{}_syntheses_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_synthesis_duration_seconds", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .record(duration_secs);
}

/// Count one streamed chunk on the given channel ("reasoning" or "answer")
pub fn record_stream_chunk(channel: &'static str) {
    counter!(
        format!("{}_stream_chunks_total", METRICS_PREFIX),
        "channel" => channel
    )
    .increment(1);
}

/// Count one malformed record that was skipped
pub fn record_skipped_record() {
    counter!(format!("{}_stream_records_skipped_total", METRICS_PREFIX)).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in UPSTREAM_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_request_metrics() {
        let metrics = RequestMetrics::start("POST", "/api/search");
        std::thread::sleep(std::time::Duration::from_millis(10));
        metrics.finish(200);
        // Just verify it runs without panic
    }
}
