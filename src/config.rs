//! Generation parameters read from `config.txt`.
//!
//! The file is a list of `key=value` lines with `#` comments. Every value has
//! a closed set of legal spellings; anything unrecognised is reported with a
//! warning and the default is kept, so a typo never aborts a run.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::settings::ConfigError;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.txt";

pub const MODEL_LITE_T2V: &str = "seedance-1-0-lite-t2v-250428";
pub const MODEL_LITE_I2V: &str = "seedance-1-0-lite-i2v-250428";
pub const MODEL_PRO: &str = "seedance-1-0-pro-250528";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    P480,
    #[default]
    P720,
    P1080,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::P480 => "480p",
            Resolution::P720 => "720p",
            Resolution::P1080 => "1080p",
        }
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "480p" => Ok(Resolution::P480),
            "720p" => Ok(Resolution::P720),
            "1080p" => Ok(Resolution::P1080),
            _ => Err("expected 480p, 720p or 1080p".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ratio {
    R21x9,
    #[default]
    R16x9,
    R4x3,
    R1x1,
    R3x4,
    R9x16,
    R9x21,
    /// Let the service follow the seed image.
    Adaptive,
    /// Keep the seed image's own ratio.
    KeepRatio,
}

impl Ratio {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ratio::R21x9 => "21:9",
            Ratio::R16x9 => "16:9",
            Ratio::R4x3 => "4:3",
            Ratio::R1x1 => "1:1",
            Ratio::R3x4 => "3:4",
            Ratio::R9x16 => "9:16",
            Ratio::R9x21 => "9:21",
            Ratio::Adaptive => "adaptive",
            Ratio::KeepRatio => "keep_ratio",
        }
    }
}

impl FromStr for Ratio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "21:9" => Ok(Ratio::R21x9),
            "16:9" => Ok(Ratio::R16x9),
            "4:3" => Ok(Ratio::R4x3),
            "1:1" => Ok(Ratio::R1x1),
            "3:4" => Ok(Ratio::R3x4),
            "9:16" => Ok(Ratio::R9x16),
            "9:21" => Ok(Ratio::R9x21),
            "adaptive" => Ok(Ratio::Adaptive),
            "keep_ratio" => Ok(Ratio::KeepRatio),
            _ => Err(
                "expected 21:9, 16:9, 4:3, 1:1, 3:4, 9:16, 9:21, adaptive or keep_ratio"
                    .to_string(),
            ),
        }
    }
}

/// Clip length in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClipDuration {
    #[default]
    Five,
    Ten,
}

impl ClipDuration {
    pub fn secs(&self) -> u32 {
        match self {
            ClipDuration::Five => 5,
            ClipDuration::Ten => 10,
        }
    }
}

impl FromStr for ClipDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_end_matches('s') {
            "5" => Ok(ClipDuration::Five),
            "10" => Ok(ClipDuration::Ten),
            _ => Err("expected 5 or 10".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameRate {
    Fps16,
    #[default]
    Fps24,
}

impl FrameRate {
    pub fn fps(&self) -> u32 {
        match self {
            FrameRate::Fps16 => 16,
            FrameRate::Fps24 => 24,
        }
    }
}

impl FromStr for FrameRate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "16" => Ok(FrameRate::Fps16),
            "24" => Ok(FrameRate::Fps24),
            _ => Err("expected 16 or 24".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Seed {
    #[default]
    Random,
    Fixed(i64),
}

impl Seed {
    /// Value for the `--seed` flag; the service reads -1 as random.
    pub fn flag_value(&self) -> i64 {
        match self {
            Seed::Random => -1,
            Seed::Fixed(n) => *n,
        }
    }
}

impl FromStr for Seed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("random") || s == "-1" {
            return Ok(Seed::Random);
        }
        match s.parse::<i64>() {
            Ok(n) if n >= 0 => Ok(Seed::Fixed(n)),
            _ => Err("expected a non-negative integer or 'random'".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelTier {
    #[default]
    Lite,
    Pro,
}

impl FromStr for ModelTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lite" => Ok(ModelTier::Lite),
            "pro" => Ok(ModelTier::Pro),
            _ => Err("expected lite or pro".to_string()),
        }
    }
}

/// Where the seed image for single and batch jobs comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Url(String),
    File(PathBuf),
}

/// Parsed `config.txt`. Built once per run and never modified.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VideoConfig {
    pub resolution: Resolution,
    pub ratio: Ratio,
    pub duration: ClipDuration,
    pub frame_rate: FrameRate,
    pub watermark: bool,
    pub seed: Seed,
    pub camera_fixed: bool,
    pub callback_url: Option<String>,
    pub model: ModelTier,
    pub image: Option<ImageSource>,
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err("expected true or false".to_string()),
    }
}

fn assign<T: FromStr<Err = String>>(slot: &mut T, key: &str, value: &str, line_no: usize) {
    match value.parse::<T>() {
        Ok(parsed) => *slot = parsed,
        Err(reason) => log::warn!(
            "config line {}: invalid {} '{}' ({}), keeping default",
            line_no,
            key,
            value,
            reason
        ),
    }
}

impl VideoConfig {
    /// Parse config text. Never fails; bad lines are logged and skipped.
    pub fn parse(text: &str) -> Self {
        let mut config = VideoConfig::default();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                log::warn!("config line {}: expected key=value, got '{}'", line_no, line);
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "resolution" => assign(&mut config.resolution, &key, value, line_no),
                "ratio" => assign(&mut config.ratio, &key, value, line_no),
                "duration" => assign(&mut config.duration, &key, value, line_no),
                "framerate" | "fps" => assign(&mut config.frame_rate, &key, value, line_no),
                "seed" => assign(&mut config.seed, &key, value, line_no),
                "model" => assign(&mut config.model, &key, value, line_no),
                "watermark" => match parse_bool(value) {
                    Ok(b) => config.watermark = b,
                    Err(reason) => {
                        log::warn!("config line {}: invalid watermark ({})", line_no, reason)
                    }
                },
                "camerafixed" | "camera_fixed" => match parse_bool(value) {
                    Ok(b) => config.camera_fixed = b,
                    Err(reason) => {
                        log::warn!("config line {}: invalid camerafixed ({})", line_no, reason)
                    }
                },
                "callback_url" => {
                    if !value.is_empty() {
                        config.callback_url = Some(value.to_string());
                    }
                }
                "image_url" => {
                    if !value.is_empty() {
                        config.image = Some(ImageSource::Url(value.to_string()));
                    }
                }
                "image_file" => {
                    if !value.is_empty() {
                        config.image = Some(ImageSource::File(PathBuf::from(value)));
                    }
                }
                other => log::warn!("config line {}: unknown key '{}' ignored", line_no, other),
            }
        }

        config
    }

    /// Read and parse a config file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the file does not exist and
    /// `ConfigError::Io` if it cannot be read.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::Missing {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self::parse(&text))
    }

    /// Ratio actually sent, given whether a seed image is attached.
    pub fn effective_ratio(&self, has_image: bool) -> Ratio {
        if has_image && self.ratio != Ratio::KeepRatio {
            Ratio::Adaptive
        } else {
            self.ratio
        }
    }

    pub fn model_id(&self, has_image: bool) -> &'static str {
        match (self.model, has_image) {
            (ModelTier::Pro, _) => MODEL_PRO,
            (ModelTier::Lite, true) => MODEL_LITE_I2V,
            (ModelTier::Lite, false) => MODEL_LITE_T2V,
        }
    }

    /// Parameter flags appended to the text prompt.
    pub fn prompt_flags(&self, has_image: bool) -> String {
        format!(
            "--resolution {} --ratio {} --duration {} --framepersecond {} --watermark {} --seed {} --camerafixed {}",
            self.resolution.as_str(),
            self.effective_ratio(has_image).as_str(),
            self.duration.secs(),
            self.frame_rate.fps(),
            self.watermark,
            self.seed.flag_value(),
            self.camera_fixed,
        )
    }
}

impl fmt::Display for VideoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "   Resolution:   {}", self.resolution.as_str())?;
        writeln!(f, "   Ratio:        {}", self.ratio.as_str())?;
        writeln!(f, "   Duration:     {}s", self.duration.secs())?;
        writeln!(f, "   Frame rate:   {} fps", self.frame_rate.fps())?;
        writeln!(f, "   Watermark:    {}", self.watermark)?;
        match self.seed {
            Seed::Random => writeln!(f, "   Seed:         random")?,
            Seed::Fixed(n) => writeln!(f, "   Seed:         {}", n)?,
        }
        writeln!(f, "   Camera fixed: {}", self.camera_fixed)?;
        let model = match self.model {
            ModelTier::Lite => "lite",
            ModelTier::Pro => "pro",
        };
        write!(f, "   Model:        {}", model)?;
        if let Some(url) = &self.callback_url {
            write!(f, "\n   Callback:     {}", url)?;
        }
        Ok(())
    }
}

/// Rewrite config text so `image_file=<path>` is the active image setting.
///
/// Existing `image_url=` / `image_file=` lines are commented out with `# `.
/// The new line goes right after the first commented image line, or at the
/// top of the file followed by a blank line when there was none.
pub fn set_image_file(text: &str, abs_path: &Path) -> String {
    let new_line = format!("image_file={}", abs_path.display());
    let mut found = false;
    let mut lines: Vec<String> = text
        .lines()
        .map(|line| {
            let stripped = line.trim();
            if stripped.starts_with("image_url=") || stripped.starts_with("image_file=") {
                found = true;
                format!("# {}", line)
            } else {
                line.to_string()
            }
        })
        .collect();

    let insert_at = if found {
        lines
            .iter()
            .position(|l| l.trim().starts_with("# image_"))
            .map(|i| i + 1)
    } else {
        None
    };

    match insert_at {
        Some(i) => lines.insert(i, new_line),
        None => {
            lines.insert(0, new_line);
            lines.insert(1, String::new());
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Commented example written when `config.txt` is missing.
pub const EXAMPLE_CONFIG: &str = "\
# Video generation settings
# Lines starting with # are ignored. Remove the # to enable a setting.

# resolution: 480p, 720p, 1080p
resolution=720p
# ratio: 21:9, 16:9, 4:3, 1:1, 3:4, 9:16, 9:21, adaptive, keep_ratio
# (forced to adaptive when a seed image is used, unless keep_ratio)
ratio=16:9
# duration in seconds: 5 or 10
duration=5
# framerate: 16 or 24
framerate=24
watermark=false
# seed: a number, or random
seed=random
camerafixed=false
# model: lite or pro
model=lite

# Seed image: a public URL or a local file (use `ark-video image auto <file>`)
# image_url=https://example.com/my-image.jpg
# image_file=/path/to/image.png

# Completion callback for batch mode (see `ark-video webhook`)
# callback_url=https://your-host/webhook
";
