//! Analysis configuration.

use bowl_analysis::DEFAULT_TOP_K;
use bowl_media::{EncodeSettings, RenderConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Analysis pipeline configuration.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Root of the reference sequence store
    pub reference_dir: PathBuf,
    /// Scratch space for per-request intermediate files
    pub work_dir: PathBuf,
    /// Where comparison videos are delivered
    pub output_dir: PathBuf,
    /// Number of offending joints to report
    pub top_k: usize,
    /// Timeout for one-shot FFmpeg runs (trim, final encode)
    pub ffmpeg_timeout: Duration,
    /// Keep the per-request work directory after the run
    pub keep_work_files: bool,
    pub render: RenderConfig,
    pub encode: EncodeSettings,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            reference_dir: PathBuf::from("./reference"),
            work_dir: PathBuf::from("/tmp/bowl"),
            output_dir: PathBuf::from("./output"),
            top_k: DEFAULT_TOP_K,
            ffmpeg_timeout: Duration::from_secs(600),
            keep_work_files: false,
            render: RenderConfig::default(),
            encode: EncodeSettings::default(),
        }
    }
}

impl AnalysisConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            reference_dir: std::env::var("BOWL_REFERENCE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.reference_dir),
            work_dir: std::env::var("BOWL_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            output_dir: std::env::var("BOWL_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            top_k: std::env::var("BOWL_TOP_K")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.top_k),
            ffmpeg_timeout: std::env::var("BOWL_FFMPEG_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.ffmpeg_timeout),
            keep_work_files: std::env::var("BOWL_KEEP_WORK_FILES")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.keep_work_files),
            render: RenderConfig::from_env(),
            encode: defaults.encode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.top_k, 4);
        assert_eq!(config.render.style.padding, 40);
        assert_eq!(config.encode.codec, "libx264");
        assert!(!config.keep_work_files);
    }
}
