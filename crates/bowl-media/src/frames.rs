//! Raw RGB frame streaming in and out of FFmpeg.

use async_trait::async_trait;
use image::RgbImage;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::command::{non_empty, FfmpegCommand};
use crate::error::{MediaError, MediaResult};

/// Sequential source of decoded frames.
#[async_trait]
pub trait FrameSource: Send {
    /// Next frame in capture order, or `None` at end of stream.
    async fn next_frame(&mut self) -> MediaResult<Option<RgbImage>>;
}

/// Sequential destination for rendered frames.
#[async_trait]
pub trait FrameSink: Send {
    /// Append one frame. Frames must arrive in output order.
    async fn write_frame(&mut self, frame: &RgbImage) -> MediaResult<()>;
}

/// Decodes a video into RGB24 frames through an FFmpeg pipe.
pub struct FrameReader {
    child: Child,
    stdout: BufReader<ChildStdout>,
    stderr: Option<JoinHandle<String>>,
    width: u32,
    height: u32,
    frames_read: usize,
}

impl FrameReader {
    /// Start decoding `path`, whose frames are `width` x `height`.
    pub fn open(path: impl AsRef<Path>, width: u32, height: u32) -> MediaResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }

        let cmd = FfmpegCommand::new(path, "-").no_audio().raw_rgb_output();
        let (mut child, stderr) = cmd.spawn_piped()?;

        // Nothing is written to a decoder's stdin.
        drop(child.stdin.take());

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::ffmpeg_failed("Failed to capture FFmpeg stdout", None, None))?;

        debug!(path = %path.display(), width, height, "Opened frame reader");

        Ok(Self {
            child,
            stdout: BufReader::new(stdout),
            stderr: Some(stderr),
            width,
            height,
            frames_read: 0,
        })
    }

    pub fn frames_read(&self) -> usize {
        self.frames_read
    }

    fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    async fn reap(&mut self) -> MediaResult<()> {
        let status = self.child.wait().await?;
        let stderr = match self.stderr.take() {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };
        if !status.success() {
            return Err(MediaError::ffmpeg_failed(
                "Frame decoder exited with non-zero status",
                non_empty(stderr),
                status.code(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl FrameSource for FrameReader {
    async fn next_frame(&mut self) -> MediaResult<Option<RgbImage>> {
        let mut buffer = vec![0u8; self.frame_bytes()];

        // A clean EOF lands exactly on a frame boundary.
        let mut filled = 0;
        while filled < buffer.len() {
            let n = self
                .stdout
                .read(&mut buffer[filled..])
                .await
                .map_err(|e| MediaError::frame_read(self.frames_read, e.to_string()))?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            self.reap().await?;
            return Ok(None);
        }
        if filled < buffer.len() {
            warn!(
                frame = self.frames_read,
                bytes = filled,
                expected = buffer.len(),
                "Truncated trailing frame discarded"
            );
            self.reap().await?;
            return Ok(None);
        }

        let frame = RgbImage::from_raw(self.width, self.height, buffer).ok_or_else(|| {
            MediaError::frame_read(self.frames_read, "frame buffer size mismatch")
        })?;
        self.frames_read += 1;
        Ok(Some(frame))
    }
}

/// Writes RGB24 frames into an intermediate MPEG-4 file through FFmpeg.
pub struct RawVideoWriter {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<String>>,
    path: PathBuf,
    width: u32,
    height: u32,
    frames_written: usize,
}

impl RawVideoWriter {
    /// Start an encoder for `width` x `height` frames at `fps`.
    pub fn create(path: impl AsRef<Path>, width: u32, height: u32, fps: f64) -> MediaResult<Self> {
        let path = path.as_ref().to_path_buf();

        let cmd = FfmpegCommand::new("-", &path)
            .raw_rgb_input(width, height, fps)
            .video_codec("mpeg4")
            .output_args(["-q:v", "2"]);
        let (mut child, stderr) = cmd.spawn_piped()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::ffmpeg_failed("Failed to capture FFmpeg stdin", None, None))?;

        debug!(path = %path.display(), width, height, fps, "Opened raw video writer");

        Ok(Self {
            child,
            stdin: Some(stdin),
            stderr: Some(stderr),
            path,
            width,
            height,
            frames_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    /// Close the pipe and wait for the encoder to flush the file.
    pub async fn finish(mut self) -> MediaResult<PathBuf> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin.shutdown().await?;
        }

        let status = self.child.wait().await?;
        let stderr = match self.stderr.take() {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            return Err(MediaError::ffmpeg_failed(
                "Raw video writer exited with non-zero status",
                non_empty(stderr),
                status.code(),
            ));
        }

        debug!(
            path = %self.path.display(),
            frames = self.frames_written,
            "Raw video written"
        );
        Ok(self.path)
    }
}

#[async_trait]
impl FrameSink for RawVideoWriter {
    async fn write_frame(&mut self, frame: &RgbImage) -> MediaResult<()> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(MediaError::frame_write(
                self.frames_written,
                format!(
                    "frame is {}x{}, writer expects {}x{}",
                    frame.width(),
                    frame.height(),
                    self.width,
                    self.height
                ),
            ));
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| MediaError::frame_write(self.frames_written, "writer already closed"))?;

        stdin
            .write_all(frame.as_raw())
            .await
            .map_err(|e| MediaError::frame_write(self.frames_written, e.to_string()))?;

        self.frames_written += 1;
        Ok(())
    }
}
