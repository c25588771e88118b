//! Audio merging, title overlays and subtitle burn-in.

use std::path::{Path, PathBuf};

use super::{run_tool, MediaError, FFMPEG};

/// How the new audio track is combined with the video's own audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioMode {
    /// Drop the original audio and use the new track.
    #[default]
    Replace,
    /// Mix both tracks; the result ends with the shorter one.
    Mix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TitleSize {
    Small,
    #[default]
    Medium,
    Large,
    XLarge,
}

impl TitleSize {
    /// Font sizes for the title and artist lines.
    pub fn font_sizes(&self) -> (u32, u32) {
        match self {
            TitleSize::Small => (48, 28),
            TitleSize::Medium => (64, 36),
            TitleSize::Large => (80, 44),
            TitleSize::XLarge => (96, 52),
        }
    }
}

/// Music-video style title card shown from 0.5s to 5.5s.
#[derive(Debug, Clone, PartialEq)]
pub struct TitleOverlay {
    pub title: String,
    pub artist: Option<String>,
    pub size: TitleSize,
    pub font_file: Option<PathBuf>,
}

/// Fonts tried in order for the title card. ffmpeg's default font is used
/// when none exist.
const FONT_CANDIDATES: &[&str] = &[
    "/System/Library/Fonts/AppleSDGothicNeo.ttc",
    "/System/Library/Fonts/Supplemental/AppleGothic.ttf",
    "/Library/Fonts/NanumGothic.ttf",
    "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
    "/usr/share/fonts/truetype/nanum/NanumGothic.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "C:/Windows/Fonts/malgun.ttf",
];

pub fn find_font() -> Option<PathBuf> {
    FONT_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

const FADE_ENABLE: &str = "enable='between(t,0.5,5.5)'";
const FADE_ALPHA: &str = "alpha='if(lt(t,1),t-0.5,if(gt(t,5),1-(t-5)/0.5,1))'";

/// Escape text for a single-quoted drawtext value.
pub fn escape_drawtext(text: &str) -> String {
    text.replace('\\', r"\\")
        .replace('\'', r"\'")
        .replace(':', r"\:")
        .replace('%', r"\%")
}

/// Escape a path for use inside a filter argument.
pub fn escape_filter_path(path: &Path) -> String {
    path.display()
        .to_string()
        .replace('\\', "/")
        .replace(':', r"\:")
        .replace('\'', r"\'")
}

fn drawtext(text: &str, font: Option<&Path>, size: u32, border: u32, y: &str) -> String {
    let font = font
        .map(|f| format!("fontfile='{}':", escape_filter_path(f)))
        .unwrap_or_default();
    format!(
        "drawtext=text='{}':{}fontsize={}:fontcolor=white:borderw={}:bordercolor=black:x=(w-text_w)/2:y={}:{}:{}",
        escape_drawtext(text),
        font,
        size,
        border,
        y,
        FADE_ENABLE,
        FADE_ALPHA
    )
}

impl TitleOverlay {
    /// The video filter chain drawing the title and optional artist line.
    pub fn filter(&self) -> String {
        let (title_size, artist_size) = self.size.font_sizes();
        let font = self.font_file.as_deref();
        let title = drawtext(&self.title, font, title_size, 4, "(h/2-text_h)-30");
        match self.artist.as_deref().filter(|a| !a.trim().is_empty()) {
            Some(artist) => {
                let artist = drawtext(artist, font, artist_size, 3, "(h/2)+30");
                format!("{},{}", title, artist)
            }
            None => title,
        }
    }
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// ffmpeg arguments for merging `audio` into `video`.
///
/// Without a title the video stream is copied; a title forces a libx264
/// re-encode.
pub fn merge_args(
    video: &Path,
    audio: &Path,
    output: &Path,
    mode: AudioMode,
    title: Option<&TitleOverlay>,
) -> Vec<String> {
    let video = video.display().to_string();
    let audio = audio.display().to_string();
    let output = output.display().to_string();
    let mut args = strings(&["-i", &video, "-i", &audio]);

    match (title, mode) {
        (None, AudioMode::Replace) => args.extend(strings(&[
            "-c:v", "copy", "-c:a", "aac", "-map", "0:v:0", "-map", "1:a:0", "-shortest",
        ])),
        (None, AudioMode::Mix) => args.extend(strings(&[
            "-filter_complex",
            "[0:a][1:a]amix=inputs=2:duration=shortest[a]",
            "-map",
            "0:v",
            "-map",
            "[a]",
            "-c:v",
            "copy",
            "-c:a",
            "aac",
        ])),
        (Some(overlay), AudioMode::Replace) => {
            let graph = format!("[0:v]{}[v]", overlay.filter());
            args.extend(strings(&[
                "-filter_complex",
                &graph,
                "-map",
                "[v]",
                "-map",
                "1:a:0",
                "-c:v",
                "libx264",
                "-preset",
                "fast",
                "-c:a",
                "aac",
                "-shortest",
            ]));
        }
        (Some(overlay), AudioMode::Mix) => {
            let graph = format!(
                "[0:v]{}[v];[0:a][1:a]amix=inputs=2:duration=shortest[a]",
                overlay.filter()
            );
            args.extend(strings(&[
                "-filter_complex",
                &graph,
                "-map",
                "[v]",
                "-map",
                "[a]",
                "-c:v",
                "libx264",
                "-preset",
                "fast",
                "-c:a",
                "aac",
            ]));
        }
    }

    args.push("-y".to_string());
    args.push(output);
    args
}

/// `<dir>/<video>_with_<audio>_<unix>.mp4`
pub fn merged_output_path(dir: &Path, video: &Path, audio: &Path, unix_secs: i64) -> PathBuf {
    let stem = |p: &Path| {
        p.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    dir.join(format!(
        "{}_with_{}_{}.mp4",
        stem(video),
        stem(audio),
        unix_secs
    ))
}

pub async fn merge_audio(
    video: &Path,
    audio: &Path,
    output: &Path,
    mode: AudioMode,
    title: Option<&TitleOverlay>,
) -> Result<(), MediaError> {
    for input in [video, audio] {
        if !input.exists() {
            return Err(MediaError::NotFound(input.display().to_string()));
        }
    }
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    run_tool(FFMPEG, merge_args(video, audio, output, mode, title)).await?;
    Ok(())
}

const SUBTITLE_STYLE: &str = "FontName=NanumGothic,FontSize=24,PrimaryColour=&H00FFFFFF,OutlineColour=&H00000000,BackColour=&HFF000000,BorderStyle=1,Outline=2,Shadow=0,MarginV=20";

pub fn burn_subtitles_args(video: &Path, srt: &Path, output: &Path) -> Vec<String> {
    let filter = format!(
        "subtitles='{}':force_style='{}'",
        escape_filter_path(srt),
        SUBTITLE_STYLE
    );
    vec![
        "-i".to_string(),
        video.display().to_string(),
        "-vf".to_string(),
        filter,
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "fast".to_string(),
        "-c:a".to_string(),
        "copy".to_string(),
        "-y".to_string(),
        output.display().to_string(),
    ]
}

/// Render `srt` into the video frames. Re-encodes the video stream.
pub async fn burn_subtitles(video: &Path, srt: &Path, output: &Path) -> Result<(), MediaError> {
    for input in [video, srt] {
        if !input.exists() {
            return Err(MediaError::NotFound(input.display().to_string()));
        }
    }
    run_tool(FFMPEG, burn_subtitles_args(video, srt, output)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay(artist: Option<&str>) -> TitleOverlay {
        TitleOverlay {
            title: "Night Drive".to_string(),
            artist: artist.map(str::to_string),
            size: TitleSize::Medium,
            font_file: None,
        }
    }

    #[test]
    fn test_font_sizes() {
        assert_eq!(TitleSize::Small.font_sizes(), (48, 28));
        assert_eq!(TitleSize::Medium.font_sizes(), (64, 36));
        assert_eq!(TitleSize::Large.font_sizes(), (80, 44));
        assert_eq!(TitleSize::XLarge.font_sizes(), (96, 52));
    }

    #[test]
    fn test_escape_drawtext() {
        assert_eq!(escape_drawtext("It's 5:00"), r"It\'s 5\:00");
        assert_eq!(escape_drawtext("100%"), r"100\%");
    }

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(
            escape_filter_path(Path::new(r"C:\subs\a.srt")),
            r"C\:/subs/a.srt"
        );
    }

    #[test]
    fn test_replace_without_title_copies_video() {
        let args = merge_args(
            Path::new("v.mp4"),
            Path::new("a.mp3"),
            Path::new("o.mp4"),
            AudioMode::Replace,
            None,
        );
        assert_eq!(
            args,
            vec![
                "-i", "v.mp4", "-i", "a.mp3", "-c:v", "copy", "-c:a", "aac", "-map", "0:v:0",
                "-map", "1:a:0", "-shortest", "-y", "o.mp4"
            ]
        );
    }

    #[test]
    fn test_mix_without_title_uses_amix() {
        let args = merge_args(
            Path::new("v.mp4"),
            Path::new("a.mp3"),
            Path::new("o.mp4"),
            AudioMode::Mix,
            None,
        );
        assert!(args.contains(&"[0:a][1:a]amix=inputs=2:duration=shortest[a]".to_string()));
        assert!(!args.contains(&"-shortest".to_string()));
        assert!(args.contains(&"copy".to_string()));
    }

    #[test]
    fn test_title_forces_reencode() {
        let title = overlay(None);
        let args = merge_args(
            Path::new("v.mp4"),
            Path::new("a.mp3"),
            Path::new("o.mp4"),
            AudioMode::Replace,
            Some(&title),
        );
        assert!(args.contains(&"libx264".to_string()));
        let graph = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];
        assert!(graph.starts_with("[0:v]drawtext=text='Night Drive'"));
        assert!(graph.ends_with("[v]"));
    }

    #[test]
    fn test_title_filter_with_artist() {
        let filter = overlay(Some("The Band")).filter();
        assert_eq!(filter.matches("drawtext=").count(), 2);
        assert!(filter.contains("fontsize=64"));
        assert!(filter.contains("fontsize=36"));
        assert!(filter.contains("y=(h/2)+30"));
        assert!(filter.contains("between(t,0.5,5.5)"));
        assert!(!filter.contains("fontfile"));
    }

    #[test]
    fn test_blank_artist_is_skipped() {
        let filter = overlay(Some("  ")).filter();
        assert_eq!(filter.matches("drawtext=").count(), 1);
    }

    #[test]
    fn test_merged_output_path() {
        assert_eq!(
            merged_output_path(
                Path::new("videos_with_audio"),
                Path::new("videos/clip.mp4"),
                Path::new("music/song.mp3"),
                1700000000
            ),
            PathBuf::from("videos_with_audio/clip_with_song_1700000000.mp4")
        );
    }

    #[test]
    fn test_burn_subtitles_args() {
        let args = burn_subtitles_args(
            Path::new("v.mp4"),
            Path::new("subs/v.srt"),
            Path::new("o.mp4"),
        );
        assert_eq!(args[3], format!("subtitles='subs/v.srt':force_style='{}'", SUBTITLE_STYLE));
        assert_eq!(args.last().unwrap(), "o.mp4");
    }
}
