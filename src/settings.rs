//! Tool settings for ark-video.
//!
//! Loaded from `ark-video.toml` in the working directory or a custom path.
//! Every section is optional; missing values fall back to built-in defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ark::{PollPolicy, ARK_API_BASE_URL};

/// Default settings file name, looked up in the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "ark-video.toml";

/// Settings file structure for ark-video.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub poll: PollSettings,
    #[serde(default)]
    pub batch: BatchSettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub webhook: WebhookSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Poll timing, all values in seconds.
#[derive(Debug, Deserialize, Clone)]
pub struct PollSettings {
    #[serde(default = "default_queued_interval")]
    pub queued_interval_secs: u64,
    #[serde(default = "default_running_interval")]
    pub running_interval_secs: u64,
    #[serde(default = "default_max_interval")]
    pub max_interval_secs: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_deadline")]
    pub deadline_secs: u64,
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            queued_interval_secs: default_queued_interval(),
            running_interval_secs: default_running_interval(),
            max_interval_secs: default_max_interval(),
            backoff_factor: default_backoff_factor(),
            deadline_secs: default_deadline(),
            max_polls: default_max_polls(),
        }
    }
}

impl PollSettings {
    /// Build the poll policy used by the status poller.
    pub fn policy(&self) -> PollPolicy {
        PollPolicy {
            queued_interval: Duration::from_secs(self.queued_interval_secs),
            running_interval: Duration::from_secs(self.running_interval_secs),
            max_interval: Duration::from_secs(self.max_interval_secs),
            backoff_factor: self.backoff_factor.max(1.0),
            deadline: Duration::from_secs(self.deadline_secs),
            max_polls: self.max_polls.max(1),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BatchSettings {
    /// Pause between consecutive submissions in batch and chain mode.
    #[serde(default = "default_inter_job_delay")]
    pub inter_job_delay_secs: u64,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            inter_job_delay_secs: default_inter_job_delay(),
        }
    }
}

impl BatchSettings {
    pub fn inter_job_delay(&self) -> Duration {
        Duration::from_secs(self.inter_job_delay_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputSettings {
    #[serde(default = "default_videos_dir")]
    pub videos_dir: PathBuf,
    #[serde(default = "default_audio_dir")]
    pub audio_output_dir: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            videos_dir: default_videos_dir(),
            audio_output_dir: default_audio_dir(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookSettings {
    #[serde(default = "default_webhook_host")]
    pub host: String,
    #[serde(default = "default_webhook_port")]
    pub port: u16,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            host: default_webhook_host(),
            port: default_webhook_port(),
        }
    }
}

fn default_base_url() -> String {
    ARK_API_BASE_URL.to_string()
}

fn default_queued_interval() -> u64 {
    5
}

fn default_running_interval() -> u64 {
    10
}

fn default_max_interval() -> u64 {
    30
}

fn default_backoff_factor() -> f64 {
    1.5
}

fn default_deadline() -> u64 {
    600
}

fn default_max_polls() -> u32 {
    60
}

fn default_inter_job_delay() -> u64 {
    3
}

fn default_videos_dir() -> PathBuf {
    PathBuf::from("videos")
}

fn default_audio_dir() -> PathBuf {
    PathBuf::from("videos_with_audio")
}

fn default_webhook_host() -> String {
    "127.0.0.1".to_string()
}

fn default_webhook_port() -> u16 {
    8000
}

impl Settings {
    /// Load settings from a file path.
    /// Returns default settings if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;
            Self::from_toml(&content).map_err(|e| ConfigError::Parse {
                path: path.clone(),
                source: e,
            })
        } else {
            log::debug!("No settings file at {}, using defaults", path.display());
            Ok(Settings::default())
        }
    }

    /// Parse settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Errors that can occur when loading configuration, settings or prompt files.
#[derive(Debug)]
pub enum ConfigError {
    /// The file does not exist.
    Missing { path: PathBuf },
    /// The file exists but has no usable content.
    Empty { path: PathBuf },
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing { path } => {
                write!(f, "File '{}' not found", path.display())
            }
            ConfigError::Empty { path } => {
                write!(f, "File '{}' is empty", path.display())
            }
            ConfigError::Io { path, source } => {
                write!(f, "Failed to read '{}': {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(
                    f,
                    "Failed to parse settings file '{}': {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}
