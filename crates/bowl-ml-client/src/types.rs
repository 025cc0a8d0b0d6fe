//! ML service request/response types.

use bowl_models::Keypoint;
use serde::{Deserialize, Serialize};

/// Pose detection request for one frame.
#[derive(Debug, Clone, Serialize)]
pub struct DetectRequest {
    /// Base64-encoded PNG
    pub image: String,
    pub width: u32,
    pub height: u32,
}

/// Detected keypoints, image-relative `(x, y)` with confidence.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectResponse {
    pub keypoints: Vec<Keypoint>,
}

/// Frame-wise classification request.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifyRequest<'a> {
    /// Category whose model scores the sequence
    pub category: &'a str,
    /// One 34-value deviation vector per step
    pub sequence: Vec<&'a [f32]>,
}

/// One abnormality probability per step.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifyResponse {
    pub probabilities: Vec<f32>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: Option<String>,
}
