//! Prompt files: `prompt.txt` for single jobs, `batch_prompts.txt` for batch
//! and chain runs.

use std::path::Path;

use crate::config::{DEFAULT_CONFIG_FILE, EXAMPLE_CONFIG};
use crate::settings::ConfigError;

pub const DEFAULT_PROMPT_FILE: &str = "prompt.txt";
pub const DEFAULT_BATCH_FILE: &str = "batch_prompts.txt";

const EXAMPLE_PROMPT: &str = "\
A lone lighthouse on a rocky cliff at dusk, waves crashing below.
The beam sweeps slowly across a stormy sea while gulls circle overhead.
Cinematic lighting, slow camera push-in.
";

const EXAMPLE_BATCH: &str = "\
# One prompt per line. Lines starting with # are ignored.
# Run a subset with: ark-video --batch 2 3
A red fox trotting through fresh snow in a pine forest, morning light
The same fox pausing on a frozen river, breath visible in the cold air
The fox curling up to sleep beneath a fallen tree as snow begins to fall
";

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::Missing {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })
}

/// Read a single prompt. The whole file is one prompt; surrounding
/// whitespace is trimmed.
pub fn read_prompt_file(path: &Path) -> Result<String, ConfigError> {
    let text = read_file(path)?;
    let prompt = text.trim();
    if prompt.is_empty() {
        return Err(ConfigError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(prompt.to_string())
}

/// Split batch text into prompts, one per line, skipping blank and `#` lines.
pub fn parse_batch_prompts(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Read a batch prompt file.
pub fn read_batch_prompts(path: &Path) -> Result<Vec<String>, ConfigError> {
    let prompts = parse_batch_prompts(&read_file(path)?);
    if prompts.is_empty() {
        return Err(ConfigError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(prompts)
}

/// A validated 1-based inclusive range over a prompt list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptRange {
    pub start: usize,
    pub end: usize,
}

impl PromptRange {
    /// Resolve optional bounds against a list of `total` prompts.
    ///
    /// `start` defaults to 1 and `end` to `total`. An `end` past the last
    /// prompt is clamped.
    pub fn resolve(
        start: Option<usize>,
        end: Option<usize>,
        total: usize,
    ) -> Result<Self, RangeError> {
        if total == 0 {
            return Err(RangeError::NoPrompts);
        }
        let start = start.unwrap_or(1);
        if start == 0 {
            return Err(RangeError::ZeroIndex);
        }
        if start > total {
            return Err(RangeError::StartPastEnd { start, total });
        }
        let end = match end {
            Some(end) if end > total => {
                log::warn!("End index {} is past the last prompt, using {}", end, total);
                total
            }
            Some(end) => end,
            None => total,
        };
        if end < start {
            return Err(RangeError::Reversed { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn count(&self) -> usize {
        self.end - self.start + 1
    }

    /// The prompts covered by this range, paired with their 1-based index.
    pub fn select<'a>(&self, prompts: &'a [String]) -> Vec<(usize, &'a str)> {
        prompts
            .iter()
            .enumerate()
            .skip(self.start - 1)
            .take(self.count())
            .map(|(i, p)| (i + 1, p.as_str()))
            .collect()
    }
}

/// Errors from resolving a batch or chain range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("No prompts to run")]
    NoPrompts,

    #[error("Prompt numbers start at 1")]
    ZeroIndex,

    #[error("Start {start} is past the last prompt ({total} prompts)")]
    StartPastEnd { start: usize, total: usize },

    #[error("End {end} is before start {start}")]
    Reversed { start: usize, end: usize },
}

/// Write commented example prompt and config files for any that are missing.
///
/// Returns the names of the files that were created.
pub fn create_example_files(dir: &Path) -> std::io::Result<Vec<&'static str>> {
    let mut created = Vec::new();
    for (name, contents) in [
        (DEFAULT_PROMPT_FILE, EXAMPLE_PROMPT),
        (DEFAULT_BATCH_FILE, EXAMPLE_BATCH),
        (DEFAULT_CONFIG_FILE, EXAMPLE_CONFIG),
    ] {
        let path = dir.join(name);
        if !path.exists() {
            std::fs::write(&path, contents)?;
            created.push(name);
        }
    }
    Ok(created)
}
