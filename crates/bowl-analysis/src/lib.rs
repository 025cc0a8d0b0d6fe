//! Motion deviation analysis.
//!
//! This crate provides:
//! - Torso-relative keypoint normalization
//! - Dynamic time warping between a reference and a test pose sequence
//! - Per-step deviation vectors along the alignment path
//! - The adapter around the external frame-wise abnormality classifier
//! - Joint error aggregation and feedback composition
//! - Keypoint sequence extraction around the external detector

pub mod align;
pub mod classify;
pub mod deviation;
pub mod error;
pub mod extract;
pub mod feedback;
pub mod normalize;
pub mod providers;

pub use align::{align_sequences, similarity_score, Alignment, AlignmentPath};
pub use classify::{
    classify_deviations, fit_to_length, interpret_probabilities, ClassifiedSequence, FrameLabel,
    ABNORMAL_PROBABILITY, MIN_SEQUENCE_LEN,
};
pub use deviation::{extract_deviations, joint_magnitudes, DeviationFrame, DeviationSequence};
pub use error::{AnalysisError, AnalysisResult};
pub use extract::{KeypointSequences, SequenceExtractor};
pub use feedback::{
    accumulate_joint_errors, build_feedback, joint_feedback, FeedbackReport, JointErrorProfile,
    SummaryTier, DEFAULT_TOP_K, JOINT_NOISE_FLOOR,
};
pub use normalize::{normalize_frame, normalize_sequence};
pub use providers::{KeypointDetector, SequenceClassifier};

/// Round to two decimals, as every reported score is.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
