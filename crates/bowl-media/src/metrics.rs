//! Media metrics.

use metrics::counter;

/// Metric names as constants for consistency.
pub mod names {
    pub const FRAMES_RENDERED_TOTAL: &str = "bowl_frames_rendered_total";
}

/// Record overlay frames written to the output stream.
pub fn record_frames_rendered(count: usize) {
    counter!(names::FRAMES_RENDERED_TOTAL).increment(count as u64);
}
