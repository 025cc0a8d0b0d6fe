#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper and deviation overlay rendering.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and a runner with timeouts
//! - FFprobe video information
//! - Source preparation (frame-range trim, portrait orientation)
//! - Raw RGB frame streaming in and out of FFmpeg
//! - Parallel, order-preserving deviation overlay rendering
//! - Final delivery encoding
//! - Render metrics

pub mod command;
pub mod encode;
pub mod error;
pub mod frames;
pub mod metrics;
pub mod overlay;
pub mod prepare;
pub mod probe;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use encode::{encode_for_delivery, intermediate_path, EncodeSettings};
pub use error::{MediaError, MediaResult};
pub use frames::{FrameReader, FrameSink, FrameSource, RawVideoWriter};
pub use overlay::{
    default_worker_count, joint_severity, map_ordered, render_frame, OverlayPlan,
    OverlayRenderer, OverlayStyle, RenderConfig, RenderFn, SKELETON_EDGES,
};
pub use prepare::{build_prepare_filter, prepare_source, resolve_range, PreparedSource};
pub use probe::{probe_video, VideoInfo};
