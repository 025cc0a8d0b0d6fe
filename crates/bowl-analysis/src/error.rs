//! Error types for analysis operations.

use thiserror::Error;

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Errors that can occur during motion analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Cannot align: {which} sequence is empty")]
    EmptySequence { which: &'static str },

    #[error(
        "Sequence too short: {len} aligned frames, at least {min} required. \
         Capture a fuller motion that includes the whole delivery"
    )]
    SequenceTooShort { len: usize, min: usize },

    #[error("Keypoint detection failed at frame {frame}: {message}")]
    Detection { frame: usize, message: String },

    #[error("No keypoints detected in any of {attempted} frames")]
    NoKeypoints { attempted: usize },

    #[error("Sequence classifier failed: {0}")]
    Classifier(String),

    #[error("Sequence classifier returned unusable output: {0}")]
    ClassifierOutput(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AnalysisError {
    /// Create a detection failure for one frame.
    pub fn detection(frame: usize, message: impl Into<String>) -> Self {
        Self::Detection {
            frame,
            message: message.into(),
        }
    }

    /// Create a classifier failure error.
    pub fn classifier(message: impl Into<String>) -> Self {
        Self::Classifier(message.into())
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Pipeline stage the error belongs to.
    pub fn stage(&self) -> &'static str {
        match self {
            AnalysisError::EmptySequence { .. } => "alignment",
            AnalysisError::SequenceTooShort { .. }
            | AnalysisError::Classifier(_)
            | AnalysisError::ClassifierOutput(_) => "classification",
            AnalysisError::Detection { .. } | AnalysisError::NoKeypoints { .. } => "extraction",
            AnalysisError::InvalidInput(_) => "input",
        }
    }
}
