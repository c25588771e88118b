//! Speech-to-text through the `whisper` command line tool.
//!
//! Whisper writes `<audio stem>.json` into an output directory; the JSON
//! `segments` become SRT cues.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{run_tool, MediaError};
use crate::subtitle::{SrtTimestamp, SubtitleEntry};

pub const WHISPER: &str = "whisper";

/// Whisper model used when none is given.
pub const DEFAULT_WHISPER_MODEL: &str = "base";

/// Whisper's JSON output. Only the fields used for subtitles are read.
#[derive(Debug, Clone, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

/// One recognised stretch of speech, times in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Transcript {
    pub fn parse(json: &str) -> Result<Self, MediaError> {
        serde_json::from_str(json).map_err(|e| MediaError::Parse {
            what: "whisper output",
            detail: e.to_string(),
        })
    }

    /// Subtitle cues for every segment with text, in order.
    pub fn entries(&self) -> Vec<SubtitleEntry> {
        self.segments
            .iter()
            .filter(|s| !s.text.trim().is_empty())
            .map(|s| SubtitleEntry {
                start: SrtTimestamp::from_seconds(s.start),
                end: SrtTimestamp::from_seconds(s.end.max(s.start)),
                text: s.text.trim().to_string(),
            })
            .collect()
    }
}

pub fn transcribe_args(
    audio: &Path,
    out_dir: &Path,
    model: &str,
    language: Option<&str>,
) -> Vec<String> {
    let mut args = vec![
        audio.display().to_string(),
        "--model".to_string(),
        model.to_string(),
        "--output_format".to_string(),
        "json".to_string(),
        "--output_dir".to_string(),
        out_dir.display().to_string(),
        "--verbose".to_string(),
        "False".to_string(),
    ];
    if let Some(language) = language {
        args.push("--language".to_string());
        args.push(language.to_string());
    }
    args
}

/// File whisper writes for `audio` inside `out_dir`.
pub fn transcript_path(audio: &Path, out_dir: &Path) -> PathBuf {
    let stem = audio
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    out_dir.join(format!("{}.json", stem))
}

/// Transcribe `audio`, using `work_dir` for whisper's intermediate JSON.
///
/// `language` is auto-detected when `None`.
///
/// # Errors
///
/// Returns `MediaError::NotFound` for a missing input, `ToolMissing` when
/// whisper is not installed, `Failed` on a non-zero exit, and `Parse` when
/// the JSON cannot be read.
pub async fn transcribe(
    audio: &Path,
    work_dir: &Path,
    model: &str,
    language: Option<&str>,
) -> Result<Transcript, MediaError> {
    if !audio.exists() {
        return Err(MediaError::NotFound(audio.display().to_string()));
    }
    tokio::fs::create_dir_all(work_dir).await?;
    run_tool(WHISPER, transcribe_args(audio, work_dir, model, language)).await?;

    let json_path = transcript_path(audio, work_dir);
    let json = tokio::fs::read_to_string(&json_path).await?;
    if let Err(e) = tokio::fs::remove_file(&json_path).await {
        log::debug!("Could not remove {}: {}", json_path.display(), e);
    }

    let transcript = Transcript::parse(&json)?;
    log::info!(
        "Transcribed {} into {} segments (language {})",
        audio.display(),
        transcript.segments.len(),
        transcript.language.as_deref().unwrap_or("unknown")
    );
    Ok(transcript)
}
