//! SRT subtitle files.
//!
//! Timestamps are held as whole milliseconds so shifting back and forth is
//! exact.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

const ARROW: &str = " --> ";

/// An SRT timestamp, `HH:MM:SS,mmm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct SrtTimestamp(pub u64);

impl SrtTimestamp {
    pub fn from_seconds(seconds: f64) -> Self {
        SrtTimestamp((seconds.max(0.0) * 1000.0).round() as u64)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Shift by `seconds`, clamping at zero.
    pub fn offset(&self, seconds: f64) -> Self {
        let delta = (seconds * 1000.0).round() as i64;
        let shifted = (self.0 as i64).saturating_add(delta);
        SrtTimestamp(shifted.max(0) as u64)
    }
}

impl fmt::Display for SrtTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = self.0;
        write!(
            f,
            "{:02}:{:02}:{:02},{:03}",
            ms / 3_600_000,
            (ms % 3_600_000) / 60_000,
            (ms % 60_000) / 1000,
            ms % 1000
        )
    }
}

impl FromStr for SrtTimestamp {
    type Err = SubtitleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SubtitleError::InvalidTimestamp(s.to_string());
        let (hms, millis) = s.trim().split_once(',').ok_or_else(invalid)?;
        let parts: Vec<&str> = hms.split(':').collect();
        if parts.len() != 3 || millis.len() != 3 {
            return Err(invalid());
        }
        let number = |p: &str| p.parse::<u64>().map_err(|_| invalid());
        let (h, m, sec, ms) = (
            number(parts[0])?,
            number(parts[1])?,
            number(parts[2])?,
            number(millis)?,
        );
        if m >= 60 || sec >= 60 {
            return Err(invalid());
        }
        Ok(SrtTimestamp(h * 3_600_000 + m * 60_000 + sec * 1000 + ms))
    }
}

/// One subtitle cue.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEntry {
    pub start: SrtTimestamp,
    pub end: SrtTimestamp,
    pub text: String,
}

/// Render cues as SRT text, numbered from 1.
pub fn format_srt(entries: &[SubtitleEntry]) -> String {
    let mut out = String::new();
    for (i, entry) in entries.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{}{}{}\n{}\n\n",
            i + 1,
            entry.start,
            ARROW,
            entry.end,
            entry.text.trim()
        ));
    }
    out
}

pub fn write_srt(path: &Path, entries: &[SubtitleEntry]) -> Result<(), SubtitleError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, format_srt(entries))?;
    Ok(())
}

fn shift_side(side: &str, seconds: f64) -> Result<String, SubtitleError> {
    // Cue lines may carry position settings after the end timestamp.
    let (stamp, rest) = match side.find(char::is_whitespace) {
        Some(i) => side.split_at(i),
        None => (side, ""),
    };
    let shifted = stamp.parse::<SrtTimestamp>()?.offset(seconds);
    Ok(format!("{}{}", shifted, rest))
}

/// Shift every cue timing line by `seconds`. Other lines are left untouched.
///
/// A line counts as a timing line when it has ` --> ` after a valid start
/// timestamp, so cue text containing an arrow is copied as is.
pub fn shift_timestamps(text: &str, seconds: f64) -> Result<String, SubtitleError> {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let (body, newline) = match line.strip_suffix("\r\n") {
            Some(body) => (body, "\r\n"),
            None => match line.strip_suffix('\n') {
                Some(body) => (body, "\n"),
                None => (line, ""),
            },
        };
        let timing = body
            .split_once(ARROW)
            .filter(|(start, _)| start.trim().parse::<SrtTimestamp>().is_ok());
        match timing {
            Some((start, end)) => {
                out.push_str(&shift_side(start.trim(), seconds)?);
                out.push_str(ARROW);
                out.push_str(&shift_side(end.trim(), seconds)?);
            }
            None => out.push_str(body),
        }
        out.push_str(newline);
    }
    Ok(out)
}

/// Replace every occurrence of `find`. Returns the new text and the count.
pub fn replace_text(text: &str, find: &str, replacement: &str) -> Result<(String, usize), SubtitleError> {
    if find.is_empty() {
        return Err(SubtitleError::EmptySearch);
    }
    let count = text.matches(find).count();
    if count == 0 {
        return Err(SubtitleError::NotFound(find.to_string()));
    }
    Ok((text.replace(find, replacement), count))
}

/// Shift a subtitle file in place.
pub fn shift_file(path: &Path, seconds: f64) -> Result<(), SubtitleError> {
    let text = read(path)?;
    std::fs::write(path, shift_timestamps(&text, seconds)?)?;
    Ok(())
}

/// Find/replace in a subtitle file in place. Returns the replacement count.
pub fn replace_in_file(path: &Path, find: &str, replacement: &str) -> Result<usize, SubtitleError> {
    let text = read(path)?;
    let (updated, count) = replace_text(&text, find, replacement)?;
    std::fs::write(path, updated)?;
    Ok(count)
}

fn read(path: &Path) -> Result<String, SubtitleError> {
    if !path.exists() {
        return Err(SubtitleError::FileNotFound(path.display().to_string()));
    }
    Ok(std::fs::read_to_string(path)?)
}

#[derive(Debug, thiserror::Error)]
pub enum SubtitleError {
    #[error("Invalid SRT timestamp '{0}', expected HH:MM:SS,mmm")]
    InvalidTimestamp(String),

    #[error("Search text is empty")]
    EmptySearch,

    #[error("'{0}' was not found in the subtitles")]
    NotFound(String),

    #[error("Subtitle file not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
