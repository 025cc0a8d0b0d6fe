//! Final delivery encoding of the rendered overlay.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Codec settings for the delivered comparison video.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSettings {
    pub codec: String,
    pub pixel_format: String,
    /// yuv420p needs even dimensions.
    pub scale_filter: String,
    pub crf: Option<u8>,
    pub preset: Option<String>,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            codec: "libx264".to_string(),
            pixel_format: "yuv420p".to_string(),
            scale_filter: "scale='trunc(iw/2)*2:trunc(ih/2)*2'".to_string(),
            crf: None,
            preset: None,
        }
    }
}

impl EncodeSettings {
    /// Build the FFmpeg command for `input` -> `output`.
    pub fn command(&self, input: &Path, output: &Path) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new(input, output)
            .video_codec(&self.codec)
            .pixel_format(&self.pixel_format)
            .video_filter(&self.scale_filter)
            .no_audio();

        if let Some(crf) = self.crf {
            cmd = cmd.crf(crf);
        }
        if let Some(ref preset) = self.preset {
            cmd = cmd.preset(preset);
        }
        cmd
    }
}

/// Path of the intermediate render for a final output path.
///
/// `comparison_x.mp4` renders into `comparison_x_raw.mp4`.
pub fn intermediate_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    output.with_file_name(format!("{}_raw.mp4", stem))
}

/// Re-encode the intermediate render for delivery.
///
/// On success the intermediate file is removed. On failure it is left in
/// place for inspection and the error names it.
pub async fn encode_for_delivery(
    raw_path: &Path,
    output: &Path,
    settings: &EncodeSettings,
    runner: &FfmpegRunner,
) -> MediaResult<PathBuf> {
    if !raw_path.exists() {
        return Err(MediaError::FileNotFound(raw_path.to_path_buf()));
    }

    info!(
        input = %raw_path.display(),
        output = %output.display(),
        codec = %settings.codec,
        "Encoding comparison video"
    );

    if let Err(e) = runner.run(&settings.command(raw_path, output)).await {
        warn!(
            raw = %raw_path.display(),
            error = %e,
            "Delivery encode failed, keeping intermediate file"
        );
        return Err(MediaError::EncodeFailed {
            raw_path: raw_path.to_path_buf(),
            message: e.to_string(),
        });
    }

    if let Err(e) = tokio::fs::remove_file(raw_path).await {
        warn!(raw = %raw_path.display(), error = %e, "Failed to remove intermediate file");
    }

    Ok(output.to_path_buf())
}
