//! Shared data models for the BowlingMate motion analysis pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Keypoints, pose frames and pose sequences
//! - Motion categories (pitch types) and their classifier lengths
//! - Analysis requests and the structured analysis report

pub mod analysis;
pub mod category;
pub mod keypoint;

// Re-export common types
pub use analysis::{
    AnalysisReport, AnalysisRequest, DtwSummary, FrameRange, RequestId, StabilitySummary,
};
pub use category::{CategoryError, MotionCategory, DEFAULT_SEQUENCE_LEN};
pub use keypoint::{
    FlatPose, Keypoint, PoseFrame, PoseSequence, FEATURE_DIM, JOINT_COUNT, MIN_CONFIDENCE,
};
