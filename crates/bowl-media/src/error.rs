//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Failed to read frame {frame}: {message}")]
    FrameRead { frame: usize, message: String },

    #[error("Failed to write frame {frame}: {message}")]
    FrameWrite { frame: usize, message: String },

    #[error("Render failed at frame {frame}: {message}")]
    RenderFailed { frame: usize, message: String },

    #[error("Encoding failed, intermediate file kept at {raw_path}: {message}")]
    EncodeFailed { raw_path: PathBuf, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a frame read error.
    pub fn frame_read(frame: usize, message: impl Into<String>) -> Self {
        Self::FrameRead {
            frame,
            message: message.into(),
        }
    }

    /// Create a frame write error.
    pub fn frame_write(frame: usize, message: impl Into<String>) -> Self {
        Self::FrameWrite {
            frame,
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Frame index the error refers to, where there is one.
    pub fn frame(&self) -> Option<usize> {
        match self {
            MediaError::FrameRead { frame, .. }
            | MediaError::FrameWrite { frame, .. }
            | MediaError::RenderFailed { frame, .. } => Some(*frame),
            _ => None,
        }
    }
}
