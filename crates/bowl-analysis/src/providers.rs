//! Capability traits for the external models.
//!
//! The pose detector and the frame-wise sequence classifier live outside
//! this crate. Handles implementing these traits are constructed by the
//! surrounding service and passed into the pipeline explicitly.

use async_trait::async_trait;
use bowl_models::{FlatPose, MotionCategory, PoseFrame};
use image::RgbImage;

use crate::error::AnalysisResult;

/// Turns one video frame into 17 raw keypoints.
///
/// Coordinates are image-relative in `[0, 1]`; confidence in `[0, 1]`.
/// Called once per frame in capture order; `index` is the frame's position
/// in the prepared clip and is carried into any error.
#[async_trait]
pub trait KeypointDetector: Send + Sync {
    async fn detect(&self, index: usize, frame: &RgbImage) -> AnalysisResult<PoseFrame>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

/// Scores a fixed-length deviation sequence frame by frame.
///
/// Returns one abnormality probability per input step. The input length is
/// always the category's expected length; the adapter in
/// [`crate::classify`] enforces that contract.
#[async_trait]
pub trait SequenceClassifier: Send + Sync {
    async fn classify(
        &self,
        sequence: &[FlatPose],
        category: &MotionCategory,
    ) -> AnalysisResult<Vec<f32>>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}
