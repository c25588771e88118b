//! CLI enum types for audio merge options.

use clap::ValueEnum;

use crate::media::audio;

/// How `add-audio` combines the new track with the video's own audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AudioMode {
    #[default]
    Replace,
    Mix,
}

impl From<AudioMode> for audio::AudioMode {
    fn from(m: AudioMode) -> Self {
        match m {
            AudioMode::Replace => audio::AudioMode::Replace,
            AudioMode::Mix => audio::AudioMode::Mix,
        }
    }
}

/// Title card size preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TitleSize {
    Small,
    #[default]
    Medium,
    Large,
    Xlarge,
}

impl From<TitleSize> for audio::TitleSize {
    fn from(s: TitleSize) -> Self {
        match s {
            TitleSize::Small => audio::TitleSize::Small,
            TitleSize::Medium => audio::TitleSize::Medium,
            TitleSize::Large => audio::TitleSize::Large,
            TitleSize::Xlarge => audio::TitleSize::XLarge,
        }
    }
}
