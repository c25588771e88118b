//! Clip trimming.

use std::path::{Path, PathBuf};

use super::{run_tool, MediaError, FFMPEG};

/// File extensions listed when picking a video to trim.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "flv", "wmv", "webm"];

/// Parse `90`, `1:30` or `0:01:30` (fractional seconds allowed) into seconds.
pub fn parse_time(input: &str) -> Result<f64, MediaError> {
    let trimmed = input.trim();
    let invalid = || MediaError::InvalidTime(trimmed.to_string());

    let parts = trimmed
        .split(':')
        .map(|p| p.trim().parse::<f64>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;

    let seconds = match parts.as_slice() {
        [s] => *s,
        [m, s] => m * 60.0 + s,
        [h, m, s] => h * 3600.0 + m * 60.0 + s,
        _ => return Err(invalid()),
    };

    if !seconds.is_finite() || seconds < 0.0 || parts.iter().any(|p| *p < 0.0) {
        return Err(invalid());
    }
    Ok(seconds)
}

/// Format seconds as `HH:MM:SS`, dropping the fractional part.
pub fn format_hms(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Format seconds as `HH:MM:SS.mmm` for ffmpeg's `-ss`/`-to`.
pub fn format_ffmpeg_time(seconds: f64) -> String {
    let ms = (seconds.max(0.0) * 1000.0).round() as u64;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        ms / 3_600_000,
        (ms % 3_600_000) / 60_000,
        (ms % 60_000) / 1000,
        ms % 1000
    )
}

/// Check a start/end pair against each other and, when known, the duration.
pub fn validate_range(start: f64, end: f64, duration: Option<f64>) -> Result<(), MediaError> {
    if let Some(duration) = duration {
        if start >= duration {
            return Err(MediaError::InvalidRange(format!(
                "Start time {} is past the end of the video ({})",
                format_hms(start),
                format_hms(duration)
            )));
        }
        if end > duration {
            return Err(MediaError::InvalidRange(format!(
                "End time {} is past the end of the video ({})",
                format_hms(end),
                format_hms(duration)
            )));
        }
    }
    if end <= start {
        return Err(MediaError::InvalidRange(format!(
            "End time {} must be after start time {}",
            format_hms(end),
            format_hms(start)
        )));
    }
    Ok(())
}

/// `<stem>_trimmed_<stamp><ext>` next to the input.
pub fn trimmed_output_path(input: &Path, stamp: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    let ext = input
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    input.with_file_name(format!("{}_trimmed_{}{}", stem, stamp, ext))
}

pub fn trim_args(input: &Path, output: &Path, start: f64, end: f64) -> Vec<String> {
    vec![
        "-i".to_string(),
        input.display().to_string(),
        "-ss".to_string(),
        format_ffmpeg_time(start),
        "-to".to_string(),
        format_ffmpeg_time(end),
        "-c".to_string(),
        "copy".to_string(),
        "-avoid_negative_ts".to_string(),
        "make_zero".to_string(),
        output.display().to_string(),
        "-y".to_string(),
    ]
}

/// Cut `[start, end]` out of `input` with stream copy.
pub async fn trim(input: &Path, output: &Path, start: f64, end: f64) -> Result<(), MediaError> {
    if !input.exists() {
        return Err(MediaError::NotFound(input.display().to_string()));
    }
    validate_range(start, end, None)?;
    run_tool(FFMPEG, trim_args(input, output, start, end)).await?;
    Ok(())
}

/// Video files directly inside `dir`, sorted by name.
pub fn list_videos(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut videos: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|e| e.to_string_lossy().to_ascii_lowercase())
                    .is_some_and(|e| VIDEO_EXTENSIONS.contains(&e.as_str()))
        })
        .collect();
    videos.sort();
    Ok(videos)
}
