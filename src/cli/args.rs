//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::enums::{AudioMode, TitleSize};
use crate::config::DEFAULT_CONFIG_FILE;
use crate::media::transcribe::DEFAULT_WHISPER_MODEL;
use crate::prompts::{DEFAULT_BATCH_FILE, DEFAULT_PROMPT_FILE};

/// Generate videos with Seedance and post-process them with ffmpeg.
///
/// Without a mode flag or subcommand, runs one job from prompt.txt.
#[derive(Parser, Debug)]
#[command(name = "ark-video")]
#[command(version, about = "Seedance video generation and ffmpeg helpers", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Run each prompt in the batch file as its own job: [START] [END]
    #[arg(long, num_args = 0..=2, value_name = "N", conflicts_with_all = ["chain", "check", "list"])]
    pub batch: Option<Vec<usize>>,

    /// Chain the batch prompts, seeding each clip with the last frame: [START] [END]
    #[arg(long, num_args = 0..=2, value_name = "N", conflicts_with_all = ["check", "list"])]
    pub chain: Option<Vec<usize>>,

    /// Show the status of a task and offer to download it
    #[arg(long, value_name = "TASK_ID", conflicts_with = "list")]
    pub check: Option<String>,

    /// List the most recent tasks
    #[arg(long, num_args = 0..=1, default_missing_value = "10", value_name = "N")]
    pub list: Option<u32>,

    /// Prompt file for single jobs
    #[arg(long, default_value = DEFAULT_PROMPT_FILE)]
    pub prompt_file: PathBuf,

    /// Prompt file for batch and chain runs (one prompt per line)
    #[arg(long, default_value = DEFAULT_BATCH_FILE)]
    pub batch_file: PathBuf,

    /// Generation config file
    #[arg(long, short, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Tool settings file (default: ark-video.toml if present)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Answer yes to every confirmation
    #[arg(long, short, global = true)]
    pub yes: bool,

    /// More log output (-v info, -vv debug)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// Which generation flow the top-level flags select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    Single,
    Batch {
        start: Option<usize>,
        end: Option<usize>,
    },
    Chain {
        start: Option<usize>,
        end: Option<usize>,
    },
    Check(String),
    List(u32),
}

fn bounds(values: &[usize]) -> (Option<usize>, Option<usize>) {
    (values.first().copied(), values.get(1).copied())
}

impl Args {
    pub fn run_mode(&self) -> RunMode {
        if let Some(values) = &self.batch {
            let (start, end) = bounds(values);
            RunMode::Batch { start, end }
        } else if let Some(values) = &self.chain {
            let (start, end) = bounds(values);
            RunMode::Chain { start, end }
        } else if let Some(id) = &self.check {
            RunMode::Check(id.clone())
        } else if let Some(n) = self.list {
            RunMode::List(n)
        } else {
            RunMode::Single
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write example prompt and config files
    Init,
    /// Cut a section out of a video without re-encoding
    Trim {
        /// Input video (default: pick from the videos directory)
        input: Option<PathBuf>,
        /// Start time: seconds, MM:SS or HH:MM:SS
        #[arg(long, short)]
        start: Option<String>,
        /// End time: seconds, MM:SS or HH:MM:SS
        #[arg(long, short)]
        end: Option<String>,
        /// Output file (default: <name>_trimmed_<timestamp> next to the input)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Add an audio track to a video, with an optional title card
    AddAudio {
        video: PathBuf,
        audio: PathBuf,
        #[arg(long, default_value = "replace")]
        mode: AudioMode,
        /// Song title shown at the start of the video
        #[arg(long)]
        title: Option<String>,
        /// Artist shown under the title
        #[arg(long, requires = "title")]
        artist: Option<String>,
        #[arg(long, default_value = "medium")]
        title_size: TitleSize,
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Also write an SRT transcript of the audio next to the output (needs whisper)
        #[arg(long)]
        subtitles: bool,
        /// Spoken language for the transcript, e.g. ko or en (default: detect)
        #[arg(long, requires = "subtitles")]
        language: Option<String>,
    },
    /// Generate and edit SRT subtitle files
    Subtitles {
        #[command(subcommand)]
        action: SubtitleAction,
    },
    /// Validate and prepare seed images
    Image {
        #[command(subcommand)]
        action: ImageAction,
    },
    /// Receive completion callbacks and download finished videos
    Webhook {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubtitleAction {
    /// Move every timestamp by SECONDS (negative moves earlier)
    Shift {
        file: PathBuf,
        #[arg(allow_negative_numbers = true)]
        seconds: f64,
    },
    /// Replace text in every cue
    Replace {
        file: PathBuf,
        find: String,
        replace: String,
    },
    /// Transcribe an audio file into an SRT file with whisper
    Generate {
        audio: PathBuf,
        /// Output file (default: <audio>_<timestamp>.srt in the audio output directory)
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Whisper model: tiny, base, small, medium or large
        #[arg(long, default_value = DEFAULT_WHISPER_MODEL)]
        model: String,
        /// Spoken language, e.g. ko or en (default: detect)
        #[arg(long)]
        language: Option<String>,
    },
    /// Render subtitles into the video frames
    Burn {
        video: PathBuf,
        srt: PathBuf,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ImageAction {
    /// Check size, format and dimensions
    Check { path: PathBuf },
    /// Print the data URL sent to the API
    Encode { path: PathBuf },
    /// Point config.txt at this image
    Auto { path: PathBuf },
}
