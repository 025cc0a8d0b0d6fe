//! FFprobe video information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// Video file information.
///
/// `width` and `height` are display dimensions: when the stream carries a
/// quarter-turn rotation they are swapped from the coded size, matching the
/// frames FFmpeg decodes with autorotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Display width in pixels
    pub width: u32,
    /// Display height in pixels
    pub height: u32,
    /// Display rotation in degrees, normalized to `0..360`
    #[serde(default)]
    pub rotation: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Number of video frames, counted or estimated
    pub frame_count: u64,
    /// Video codec
    pub codec: String,
}

impl VideoInfo {
    /// Landscape sources are rotated to portrait before analysis.
    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }

    /// Index of the last frame, if the video has any.
    pub fn last_frame(&self) -> Option<u64> {
        self.frame_count.checked_sub(1)
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    tags: Option<FfprobeTags>,
    #[serde(default)]
    side_data_list: Vec<FfprobeSideData>,
}

#[derive(Debug, Deserialize)]
struct FfprobeTags {
    rotate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeSideData {
    rotation: Option<f64>,
}

impl FfprobeStream {
    /// Rotation from the display matrix, falling back to the legacy tag.
    fn rotation(&self) -> u32 {
        let degrees = self
            .side_data_list
            .iter()
            .find_map(|d| d.rotation)
            .or_else(|| {
                self.tags
                    .as_ref()
                    .and_then(|t| t.rotate.as_ref())
                    .and_then(|r| r.trim().parse::<f64>().ok())
            })
            .unwrap_or(0.0);
        (degrees.round() as i64).rem_euclid(360) as u32
    }
}

/// Probe a video file for information.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: "FFprobe failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    parse_probe_output(&output.stdout)
}

fn parse_probe_output(json: &[u8]) -> MediaResult<VideoInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(json)?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::InvalidVideo("No video stream found".to_string()))?;

    let coded_width = video_stream.width.unwrap_or(0);
    let coded_height = video_stream.height.unwrap_or(0);
    if coded_width == 0 || coded_height == 0 {
        return Err(MediaError::InvalidVideo(format!(
            "Video stream has no usable dimensions ({}x{})",
            coded_width, coded_height
        )));
    }

    let rotation = video_stream.rotation();
    let (width, height) = if rotation == 90 || rotation == 270 {
        (coded_height, coded_width)
    } else {
        (coded_width, coded_height)
    };

    let duration = video_stream
        .duration
        .as_ref()
        .or(probe.format.duration.as_ref())
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let fps = video_stream
        .avg_frame_rate
        .as_ref()
        .and_then(|r| parse_frame_rate(r))
        .or_else(|| {
            video_stream
                .r_frame_rate
                .as_ref()
                .and_then(|r| parse_frame_rate(r))
        })
        .unwrap_or(30.0);

    // Containers without a frame count get an estimate from duration.
    let frame_count = video_stream
        .nb_frames
        .as_ref()
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or_else(|| (duration * fps).round().max(0.0) as u64);

    Ok(VideoInfo {
        duration,
        width,
        height,
        rotation,
        fps,
        frame_count,
        codec: video_stream.codec_name.clone().unwrap_or_default(),
    })
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 && num > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok().filter(|fps: &f64| *fps > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
    }

    #[test]
    fn test_parse_probe_output_with_frame_count() {
        let json = br#"{
            "format": {"duration": "4.000000"},
            "streams": [
                {"codec_type": "audio", "codec_name": "aac"},
                {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080,
                 "r_frame_rate": "30/1", "avg_frame_rate": "30/1", "nb_frames": "121"}
            ]
        }"#;

        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.width, 1920);
        assert_eq!(info.frame_count, 121);
        assert_eq!(info.last_frame(), Some(120));
        assert!(info.is_landscape());
    }

    #[test]
    fn test_frame_count_estimated_from_duration() {
        let json = br#"{
            "format": {"duration": "2.5"},
            "streams": [
                {"codec_type": "video", "codec_name": "vp9", "width": 720, "height": 1280,
                 "avg_frame_rate": "0/0", "r_frame_rate": "24/1"}
            ]
        }"#;

        let info = parse_probe_output(json).unwrap();
        assert!((info.fps - 24.0).abs() < 1e-9);
        assert_eq!(info.frame_count, 60);
        assert!(!info.is_landscape());
    }

    #[test]
    fn test_rotated_phone_video_is_portrait() {
        let json = br#"{
            "format": {"duration": "3.0"},
            "streams": [
                {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080,
                 "avg_frame_rate": "30/1", "nb_frames": "90",
                 "side_data_list": [
                    {"side_data_type": "Display Matrix", "displaymatrix": "...", "rotation": -90}
                 ]}
            ]
        }"#;

        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.rotation, 270);
        assert_eq!((info.width, info.height), (1080, 1920));
        assert!(!info.is_landscape());
    }

    #[test]
    fn test_legacy_rotate_tag() {
        let json = br#"{
            "format": {"duration": "1.0"},
            "streams": [
                {"codec_type": "video", "width": 1280, "height": 720,
                 "avg_frame_rate": "30/1", "tags": {"rotate": "90"}}
            ]
        }"#;

        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.rotation, 90);
        assert!(!info.is_landscape());
    }

    #[test]
    fn test_upside_down_landscape_stays_landscape() {
        let json = br#"{
            "format": {"duration": "1.0"},
            "streams": [
                {"codec_type": "video", "width": 1920, "height": 1080,
                 "avg_frame_rate": "30/1", "side_data_list": [{"rotation": 180}]}
            ]
        }"#;

        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.rotation, 180);
        assert!(info.is_landscape());
    }

    #[test]
    fn test_missing_video_stream_rejected() {
        let json = br#"{"format": {}, "streams": [{"codec_type": "audio"}]}"#;
        assert!(matches!(
            parse_probe_output(json),
            Err(MediaError::InvalidVideo(_))
        ));
    }
}
