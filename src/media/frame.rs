//! Last-frame extraction for chained generation.

use std::future::Future;
use std::path::{Path, PathBuf};

use crate::seed_image::SeedImage;

use super::{run_tool, MediaError, FFMPEG};

/// Produces the seed image for the next clip in a chain.
pub trait FrameSource {
    fn last_frame(&self, clip: &Path)
        -> impl Future<Output = Result<SeedImage, MediaError>> + Send;
}

/// Extracts frames with the ffmpeg binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegFrames;

/// `<stem>_last_frame.png` next to the clip.
pub fn last_frame_path(clip: &Path) -> PathBuf {
    let stem = clip
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "clip".to_string());
    clip.with_file_name(format!("{}_last_frame.png", stem))
}

pub fn last_frame_args(clip: &Path, frame: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-sseof".to_string(),
        "-0.1".to_string(),
        "-i".to_string(),
        clip.display().to_string(),
        "-update".to_string(),
        "1".to_string(),
        frame.display().to_string(),
    ]
}

impl FfmpegFrames {
    /// Write the final frame of `clip` to a PNG and return its path.
    pub async fn extract_last_frame(&self, clip: &Path) -> Result<PathBuf, MediaError> {
        if !clip.exists() {
            return Err(MediaError::NotFound(clip.display().to_string()));
        }
        let frame = last_frame_path(clip);
        run_tool(FFMPEG, last_frame_args(clip, &frame)).await?;
        if !frame.exists() {
            return Err(MediaError::NotFound(frame.display().to_string()));
        }
        Ok(frame)
    }
}

impl FrameSource for FfmpegFrames {
    async fn last_frame(&self, clip: &Path) -> Result<SeedImage, MediaError> {
        let frame = self.extract_last_frame(clip).await?;
        log::info!("Extracted last frame to {}", frame.display());

        tokio::task::spawn_blocking(move || SeedImage::from_file(&frame))
            .await
            .map_err(|e| MediaError::Io(std::io::Error::other(e)))?
            .map_err(MediaError::from)
    }
}
