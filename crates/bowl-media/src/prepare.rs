//! Source preparation: cut the requested frame range and orient to portrait.
//!
//! Both the keypoint detector and the overlay renderer read the prepared
//! clip, so every frame index downstream refers to the same picture.

use bowl_models::FrameRange;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::{probe_video, VideoInfo};

/// A trimmed, portrait-oriented clip ready for analysis.
#[derive(Debug, Clone)]
pub struct PreparedSource {
    pub path: PathBuf,
    /// Resolved inclusive range in source frame indices
    pub range: FrameRange,
    /// Whether the source was rotated from landscape
    pub rotated: bool,
    /// Properties of the prepared clip
    pub info: VideoInfo,
}

/// FFmpeg filter selecting `start..=end` and rotating landscape input.
pub fn build_prepare_filter(start: u64, end: u64, rotate: bool) -> String {
    let mut filter = format!(
        "select='between(n\\,{}\\,{})',setpts=N/FRAME_RATE/TB",
        start, end
    );
    if rotate {
        filter.push_str(",transpose=1");
    }
    filter
}

/// Resolve a requested range against the source's frame count.
pub fn resolve_range(requested: &FrameRange, source: &VideoInfo) -> MediaResult<FrameRange> {
    let last = source
        .last_frame()
        .ok_or_else(|| MediaError::InvalidVideo("Video has no frames".to_string()))?;

    if requested.start > last {
        return Err(MediaError::InvalidVideo(format!(
            "start frame {} is beyond the last frame {}",
            requested.start, last
        )));
    }

    let range = requested.resolve(last);
    range.validate().map_err(MediaError::InvalidVideo)?;
    Ok(range)
}

/// Cut `range` out of `input` into `output`, rotating landscape sources.
pub async fn prepare_source(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    requested: &FrameRange,
    runner: &FfmpegRunner,
) -> MediaResult<PreparedSource> {
    let input = input.as_ref();
    let output = output.as_ref();

    let source = probe_video(input).await?;
    let range = resolve_range(requested, &source)?;
    let end = range.end.unwrap_or(range.start);
    // Orientation is judged on display size; FFmpeg autorotates before the
    // filter graph, so a rotated portrait clip needs no transpose.
    let rotated = source.is_landscape();

    info!(
        input = %input.display(),
        start = range.start,
        end,
        width = source.width,
        height = source.height,
        source_rotation = source.rotation,
        rotated,
        "Preparing source clip"
    );

    let cmd = FfmpegCommand::new(input, output)
        .video_filter(build_prepare_filter(range.start, end, rotated))
        .output_args(["-vsync", "0"])
        .no_audio()
        .video_codec("libx264")
        .preset("veryfast")
        .crf(18);

    runner.run(&cmd).await?;

    let info = probe_video(output).await?;
    Ok(PreparedSource {
        path: output.to_path_buf(),
        range,
        rotated,
        info,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(width: u32, height: u32, frames: u64) -> VideoInfo {
        VideoInfo {
            duration: frames as f64 / 30.0,
            width,
            height,
            rotation: 0,
            fps: 30.0,
            frame_count: frames,
            codec: "h264".to_string(),
        }
    }

    #[test]
    fn test_filter_for_portrait_source() {
        assert_eq!(
            build_prepare_filter(10, 250, false),
            "select='between(n\\,10\\,250)',setpts=N/FRAME_RATE/TB"
        );
    }

    #[test]
    fn test_filter_rotates_landscape_source() {
        assert!(build_prepare_filter(0, 99, true).ends_with(",transpose=1"));
    }

    #[test]
    fn test_open_end_resolves_to_last_frame() {
        let range = resolve_range(&FrameRange::new(5, None), &source(720, 1280, 300)).unwrap();
        assert_eq!(range, FrameRange::new(5, Some(299)));
    }

    #[test]
    fn test_overlong_end_is_clamped() {
        let range = resolve_range(&FrameRange::new(0, Some(1000)), &source(720, 1280, 300)).unwrap();
        assert_eq!(range.end, Some(299));
    }

    #[test]
    fn test_inverted_range_rejected() {
        assert!(resolve_range(&FrameRange::new(200, Some(100)), &source(720, 1280, 300)).is_err());
        assert!(resolve_range(&FrameRange::new(400, None), &source(720, 1280, 300)).is_err());
    }

    #[test]
    fn test_display_rotated_portrait_is_not_transposed() {
        let mut phone = source(1080, 1920, 300);
        phone.rotation = 90;
        assert!(!phone.is_landscape());
        assert_eq!(
            build_prepare_filter(0, 299, phone.is_landscape()),
            "select='between(n\\,0\\,299)',setpts=N/FRAME_RATE/TB"
        );
    }

    #[test]
    fn test_empty_video_rejected() {
        assert!(matches!(
            resolve_range(&FrameRange::default(), &source(720, 1280, 0)),
            Err(MediaError::InvalidVideo(_))
        ));
    }
}
