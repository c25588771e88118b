//! Command-line interface definitions and helpers.
//!
//! This module contains all CLI argument parsing, enums, and subcommand handlers.

mod args;
mod commands;
mod enums;

pub use args::{Args, Command, ImageAction, RunMode, SubtitleAction};
pub use commands::{
    add_audio, handle_image_action, handle_subtitle_action, init_files, load_seed_image,
    run_webhook, save_transcript, subtitled_output_path, transcript_output_path, trim_video,
    AddAudio,
};
pub use enums::{AudioMode, TitleSize};
