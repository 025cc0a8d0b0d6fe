//! Pipeline metrics.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const ANALYSIS_REQUESTS_TOTAL: &str = "bowl_analysis_requests_total";
    pub const STAGE_DURATION_SECONDS: &str = "bowl_stage_duration_seconds";
    pub const DETECTION_FAILURES_TOTAL: &str = "bowl_detection_failures_total";
}

/// Record a finished request; `outcome` is `success` or the failing stage.
pub fn record_request(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::ANALYSIS_REQUESTS_TOTAL, &labels).increment(1);
}

/// Record how long a pipeline stage took.
pub fn record_stage(stage: &'static str, duration_secs: f64) {
    let labels = [("stage", stage.to_string())];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record frames the detector failed on.
pub fn record_detection_failures(count: usize) {
    if count > 0 {
        counter!(names::DETECTION_FAILURES_TOTAL).increment(count as u64);
    }
}
