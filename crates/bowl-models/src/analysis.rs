//! Analysis request and report models.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::MotionCategory;

/// Unique identifier for one analysis request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new random request ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check the ID is usable as a single directory name.
    ///
    /// Only ASCII letters, digits, `-` and `_` are accepted.
    pub fn validate(&self) -> Result<(), String> {
        if self.0.is_empty() {
            return Err("Request ID must not be empty".to_string());
        }
        if !self
            .0
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(format!(
                "Request ID '{}' may only contain letters, digits, '-' and '_'",
                self.0
            ));
        }
        Ok(())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive frame range of the source video to analyze.
///
/// `end = None` means "through the last frame".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct FrameRange {
    pub start: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
}

impl FrameRange {
    pub fn new(start: u64, end: Option<u64>) -> Self {
        Self { start, end }
    }

    /// Clamp the end against the index of the video's last frame.
    ///
    /// An open or overlong end becomes `last_frame`, matching how the
    /// trimmed clip is cut.
    pub fn resolve(&self, last_frame: u64) -> FrameRange {
        let end = match self.end {
            Some(end) if end <= last_frame => end,
            _ => last_frame,
        };
        FrameRange {
            start: self.start,
            end: Some(end),
        }
    }

    /// Validate the range.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(end) = self.end {
            if self.start > end {
                return Err(format!(
                    "start frame {} is after end frame {}",
                    self.start, end
                ));
            }
        }
        Ok(())
    }
}

/// One analysis request as handed over by the calling service.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub request_id: RequestId,
    /// Path to the uploaded source video
    #[schemars(with = "String")]
    pub video_path: PathBuf,
    /// Motion category to compare against
    pub category: MotionCategory,
    /// Frame range of the delivery within the video
    #[serde(default)]
    pub range: FrameRange,
}

impl AnalysisRequest {
    pub fn new(video_path: impl Into<PathBuf>, category: MotionCategory, range: FrameRange) -> Self {
        Self {
            request_id: RequestId::new(),
            video_path: video_path.into(),
            category,
            range,
        }
    }

    /// Validate the request.
    pub fn validate(&self) -> Result<(), String> {
        if self.video_path.as_os_str().is_empty() {
            return Err("Video path must be specified".to_string());
        }
        self.request_id.validate()?;
        self.range.validate()
    }
}

/// Alignment-derived part of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DtwSummary {
    /// Accumulated DTW distance (lower is better), rounded to 4 decimals
    pub distance: f64,
    /// Similarity score 0-100 (higher is better)
    pub score: f64,
}

/// Classifier-derived part of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StabilitySummary {
    /// Stability score 0-100
    pub score: f64,
    /// Share of aligned frames the classifier marked abnormal
    pub abnormal_ratio: f64,
}

/// Structured result of one analysis request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisReport {
    pub request_id: RequestId,
    pub category: MotionCategory,
    /// Analyzed frame range `[start, end]`
    pub range: [u64; 2],
    pub dtw: DtwSummary,
    pub stability: StabilitySummary,
    /// Top offending joint indices, worst first
    pub top_joints: Vec<usize>,
    /// One-line overall verdict
    pub summary: String,
    /// One sentence per top joint
    pub joint_feedback: Vec<String>,
    /// Full human-readable feedback text
    pub feedback: String,
    /// Rendered overlay video
    #[schemars(with = "String")]
    pub comparison_video_path: PathBuf,
    pub created_at: DateTime<Utc>,
}
