//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Analysis error: {0}")]
    Analysis(#[from] bowl_analysis::AnalysisError),

    #[error("Media error: {0}")]
    Media(#[from] bowl_media::MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] bowl_storage::StorageError),

    #[error("ML service error: {0}")]
    Ml(#[from] bowl_ml_client::MlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Pipeline stage the failure belongs to.
    pub fn stage(&self) -> &'static str {
        match self {
            WorkerError::InvalidRequest(_) => "input",
            WorkerError::Analysis(e) => e.stage(),
            WorkerError::Media(e) => match e {
                bowl_media::MediaError::EncodeFailed { .. } => "encode",
                bowl_media::MediaError::RenderFailed { .. }
                | bowl_media::MediaError::FrameWrite { .. } => "render",
                bowl_media::MediaError::InvalidVideo(_)
                | bowl_media::MediaError::FileNotFound(_) => "input",
                _ => "media",
            },
            WorkerError::Storage(_) => "reference",
            WorkerError::Ml(_) => "model_service",
            WorkerError::Io(_) => "io",
        }
    }

    /// Whether the caller could fix the failure by changing the request.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            WorkerError::InvalidRequest(_)
                | WorkerError::Analysis(bowl_analysis::AnalysisError::SequenceTooShort { .. })
                | WorkerError::Analysis(bowl_analysis::AnalysisError::NoKeypoints { .. })
                | WorkerError::Media(bowl_media::MediaError::InvalidVideo(_))
        )
    }
}
