//! Media duration via ffprobe.

use std::path::Path;

use serde::Deserialize;

use super::{run_tool, MediaError, FFPROBE};

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    duration: Option<String>,
}

pub fn probe_args(path: &Path) -> Vec<String> {
    vec![
        "-v".to_string(),
        "quiet".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        "-show_entries".to_string(),
        "format=duration".to_string(),
        path.display().to_string(),
    ]
}

/// Extract `format.duration` (seconds) from ffprobe's JSON output.
pub fn parse_probe_json(json: &str) -> Result<f64, MediaError> {
    let parsed: ProbeOutput = serde_json::from_str(json).map_err(|e| MediaError::Parse {
        what: "ffprobe output",
        detail: e.to_string(),
    })?;

    let raw = parsed
        .format
        .and_then(|f| f.duration)
        .ok_or_else(|| MediaError::Parse {
            what: "ffprobe output",
            detail: "no format.duration".to_string(),
        })?;

    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| MediaError::Parse {
            what: "media duration",
            detail: raw.clone(),
        })
}

/// Duration of a media file in seconds.
pub async fn media_duration(path: &Path) -> Result<f64, MediaError> {
    if !path.exists() {
        return Err(MediaError::NotFound(path.display().to_string()));
    }
    let output = run_tool(FFPROBE, probe_args(path)).await?;
    parse_probe_json(&String::from_utf8_lossy(&output.stdout))
}
