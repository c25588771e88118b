//! ffmpeg and ffprobe wrappers.
//!
//! Every operation builds an argument list (kept as plain functions so the
//! command lines can be tested without the binaries installed) and runs it
//! through [`run_tool`].

use std::ffi::OsStr;
use std::process::{Output, Stdio};

use tokio::process::Command;

use crate::seed_image::SeedImageError;

pub mod audio;
pub mod concat;
pub mod frame;
pub mod probe;
pub mod transcribe;
pub mod trim;

pub use frame::{FfmpegFrames, FrameSource};

pub const FFMPEG: &str = "ffmpeg";
pub const FFPROBE: &str = "ffprobe";

/// Number of trailing stderr lines kept in `MediaError::Failed`.
const STDERR_TAIL_LINES: usize = 20;

/// Errors from running media tools.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("{tool} not found. {}", install_hint(.tool))]
    ToolMissing { tool: String },

    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        source: std::io::Error,
    },

    #[error("{tool} exited with code {code:?}:\n{stderr}")]
    Failed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Could not parse {what}: {detail}")]
    Parse { what: &'static str, detail: String },

    #[error("Invalid time '{0}'. Use seconds (90), MM:SS (1:30) or HH:MM:SS (0:01:30)")]
    InvalidTime(String),

    #[error("{0}")]
    InvalidRange(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SeedImage(#[from] SeedImageError),
}

fn install_hint(tool: &str) -> &'static str {
    match tool {
        transcribe::WHISPER => "Please install Whisper:\n\n    pip install openai-whisper\n",
        _ => "Please install FFmpeg:\n\n    macOS:   brew install ffmpeg\n    Ubuntu:  sudo apt install ffmpeg\n    Windows: https://ffmpeg.org/download.html\n",
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Run a tool to completion, capturing its output.
///
/// The child is killed if the returned future is dropped, so an interrupted
/// command does not leave ffmpeg running in the background.
///
/// # Errors
///
/// Returns `MediaError::ToolMissing` when the binary is not on `PATH`,
/// `MediaError::Spawn` for other launch failures, and `MediaError::Failed`
/// with the tail of stderr on a non-zero exit.
pub async fn run_tool<I, S>(tool: &str, args: I) -> Result<Output, MediaError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(tool);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    log::debug!("Running {:?}", command.as_std());

    let output = command.output().await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MediaError::ToolMissing {
                tool: tool.to_string(),
            }
        } else {
            MediaError::Spawn {
                tool: tool.to_string(),
                source: e,
            }
        }
    })?;

    if !output.status.success() {
        return Err(MediaError::Failed {
            tool: tool.to_string(),
            code: output.status.code(),
            stderr: stderr_tail(&output.stderr),
        });
    }

    Ok(output)
}

/// Check that a tool can be launched at all.
pub async fn ensure_tool(tool: &str) -> Result<(), MediaError> {
    run_tool(tool, ["-version"]).await.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let stderr: String = (1..=30).map(|i| format!("line {}\n", i)).collect();
        let tail = stderr_tail(stderr.as_bytes());
        assert!(tail.starts_with("line 11"));
        assert!(tail.ends_with("line 30"));
    }

    #[tokio::test]
    async fn test_missing_tool_is_reported() {
        let err = run_tool("ark-video-no-such-tool", ["-version"])
            .await
            .unwrap_err();
        match err {
            MediaError::ToolMissing { tool } => assert_eq!(tool, "ark-video-no-such-tool"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_tool_missing_message_has_install_hint() {
        let err = MediaError::ToolMissing {
            tool: "ffmpeg".to_string(),
        };
        assert!(err.to_string().contains("brew install ffmpeg"));

        let err = MediaError::ToolMissing {
            tool: "whisper".to_string(),
        };
        assert!(err.to_string().contains("pip install openai-whisper"));
    }
}
