//! Subcommand handlers for init, trim, add-audio, subtitles, image and webhook.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use super::args::{ImageAction, SubtitleAction};
use super::enums::{AudioMode, TitleSize};
use crate::config::{set_image_file, ImageSource, EXAMPLE_CONFIG};
use crate::context::{confirm, prompt_line};
use crate::media::audio::{self, find_font, merged_output_path, TitleOverlay};
use crate::media::probe::media_duration;
use crate::media::transcribe::{self, Transcript, DEFAULT_WHISPER_MODEL};
use crate::media::trim::{self, format_hms, list_videos, parse_time, trimmed_output_path, validate_range};
use crate::prompts::create_example_files;
use crate::seed_image::{self, SeedImage, SeedImageError};
use crate::settings::Settings;
use crate::shutdown::Shutdown;
use crate::subtitle;
use crate::webhook::{self, WebhookState};
use crate::workflow::{file_timestamp, format_size};

fn flush() {
    std::io::stdout().flush().ok();
}

/// Write example prompt and config files into `dir`.
pub fn init_files(dir: &Path) -> Result<(), String> {
    let created =
        create_example_files(dir).map_err(|e| format!("Failed to write example files: {}", e))?;
    if created.is_empty() {
        println!("Example files already exist.");
    } else {
        for name in created {
            println!("Created {}", name);
        }
    }
    Ok(())
}

/// Turn the configured image into a seed image.
///
/// Local files are decoded and re-encoded on a blocking thread.
pub async fn load_seed_image(source: Option<&ImageSource>) -> Result<Option<SeedImage>, String> {
    match source {
        None => Ok(None),
        Some(ImageSource::Url(url)) => Ok(Some(SeedImage::Url(url.clone()))),
        Some(ImageSource::File(path)) => {
            let path = path.clone();
            let seed = tokio::task::spawn_blocking(move || SeedImage::from_file(&path))
                .await
                .map_err(|e| format!("Image task failed: {}", e))?
                .map_err(|e| e.to_string())?;
            Ok(Some(seed))
        }
    }
}

async fn choose_video(dir: &Path) -> Result<PathBuf, String> {
    let videos = list_videos(dir).map_err(|e| format!("Cannot read {}: {}", dir.display(), e))?;
    if videos.is_empty() {
        return Err(format!("No videos found in {}", dir.display()));
    }

    println!("Videos in {}:", dir.display());
    for (i, video) in videos.iter().enumerate() {
        let name = video
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!("  {}. {}", i + 1, name);
    }

    let answer = prompt_line(&format!("Select a video (1-{}): ", videos.len()))
        .await
        .ok_or_else(|| "No video selected".to_string())?;
    let choice: usize = answer
        .parse()
        .map_err(|_| format!("Invalid selection: {}", answer))?;
    choice
        .checked_sub(1)
        .and_then(|i| videos.get(i))
        .cloned()
        .ok_or_else(|| format!("Invalid selection: {}", choice))
}

async fn read_time(value: Option<String>, label: &str) -> Result<f64, String> {
    let raw = match value {
        Some(v) => v,
        None => prompt_line(&format!("{} (seconds, MM:SS or HH:MM:SS): ", label))
            .await
            .ok_or_else(|| format!("{} is required", label))?,
    };
    parse_time(&raw).map_err(|e| e.to_string())
}

/// `trim`: cut a section with stream copy.
pub async fn trim_video(
    settings: &Settings,
    input: Option<PathBuf>,
    start: Option<String>,
    end: Option<String>,
    output: Option<PathBuf>,
    assume_yes: bool,
) -> Result<(), String> {
    let input = match input {
        Some(path) => path,
        None => choose_video(&settings.output.videos_dir).await?,
    };
    if !input.exists() {
        return Err(format!("File not found: {}", input.display()));
    }

    let duration = match media_duration(&input).await {
        Ok(d) => {
            println!("Video: {} ({})", input.display(), format_hms(d));
            Some(d)
        }
        Err(e) => {
            log::warn!("Could not read duration of {}: {}", input.display(), e);
            None
        }
    };

    let start = read_time(start, "Start time").await?;
    let end = read_time(end, "End time").await?;
    validate_range(start, end, duration).map_err(|e| e.to_string())?;

    let output = output.unwrap_or_else(|| trimmed_output_path(&input, &file_timestamp()));
    println!(
        "Trim {} to {} ({:.1}s)",
        format_hms(start),
        format_hms(end),
        end - start
    );
    println!("Output: {}", output.display());
    if !assume_yes && !confirm("Proceed?", true).await {
        println!("Cancelled.");
        return Ok(());
    }

    print!("Trimming... ");
    flush();
    if let Err(e) = trim::trim(&input, &output, start, end).await {
        println!("failed");
        return Err(e.to_string());
    }
    println!("done");
    let size = std::fs::metadata(&output).map(|m| m.len()).unwrap_or(0);
    println!("Saved: {} ({})", output.display(), format_size(size));
    Ok(())
}

/// Options for `add-audio`.
#[derive(Debug, Clone)]
pub struct AddAudio {
    pub video: PathBuf,
    pub audio: PathBuf,
    pub mode: AudioMode,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub title_size: TitleSize,
    pub output: Option<PathBuf>,
    /// Write an SRT transcript of the audio next to the output.
    pub subtitles: bool,
    pub language: Option<String>,
}

/// `add-audio`: merge an audio track, optionally with a title card.
pub async fn add_audio(settings: &Settings, opts: AddAudio) -> Result<(), String> {
    let overlay = opts.title.map(|title| TitleOverlay {
        title,
        artist: opts.artist,
        size: opts.title_size.into(),
        font_file: find_font(),
    });
    if let Some(overlay) = &overlay {
        if overlay.font_file.is_none() {
            log::warn!("No title font found, using ffmpeg's default font");
        }
    }

    for (label, path) in [("Video", &opts.video), ("Audio", &opts.audio)] {
        if let Ok(d) = media_duration(path).await {
            println!("{}: {} ({})", label, path.display(), format_hms(d));
        }
    }

    let output = opts.output.unwrap_or_else(|| {
        merged_output_path(
            &settings.output.audio_output_dir,
            &opts.video,
            &opts.audio,
            chrono::Utc::now().timestamp(),
        )
    });
    match opts.mode {
        AudioMode::Replace => println!("Mode: replace the original audio"),
        AudioMode::Mix => println!("Mode: mix with the original audio"),
    }

    print!("Merging... ");
    flush();
    if let Err(e) =
        audio::merge_audio(&opts.video, &opts.audio, &output, opts.mode.into(), overlay.as_ref()).await
    {
        println!("failed");
        return Err(e.to_string());
    }
    println!("done");
    let size = std::fs::metadata(&output).map(|m| m.len()).unwrap_or(0);
    println!("Saved: {} ({})", output.display(), format_size(size));

    if opts.subtitles {
        // The merged video is kept even when transcription fails.
        let srt = output.with_extension("srt");
        if let Err(e) =
            generate_srt(&opts.audio, &srt, DEFAULT_WHISPER_MODEL, opts.language.as_deref()).await
        {
            eprintln!("Subtitles skipped: {}", e);
        }
    }
    Ok(())
}

/// `<dir>/<audio>_<stamp>.srt`
pub fn transcript_output_path(dir: &Path, audio: &Path, stamp: &str) -> PathBuf {
    let stem = audio
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    dir.join(format!("{}_{}.srt", stem, stamp))
}

/// Write a transcript as SRT. Returns the cue count.
pub fn save_transcript(transcript: &Transcript, srt: &Path) -> Result<usize, String> {
    let entries = transcript.entries();
    if entries.is_empty() {
        return Err("No speech was recognised".to_string());
    }
    subtitle::write_srt(srt, &entries).map_err(|e| format!("Cannot write {}: {}", srt.display(), e))?;
    Ok(entries.len())
}

async fn generate_srt(
    audio: &Path,
    srt: &Path,
    model: &str,
    language: Option<&str>,
) -> Result<(), String> {
    let work_dir = match srt.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    print!("Transcribing {} with whisper ({})... ", audio.display(), model);
    flush();
    let transcript = match transcribe::transcribe(audio, &work_dir, model, language).await {
        Ok(transcript) => transcript,
        Err(e) => {
            println!("failed");
            return Err(e.to_string());
        }
    };
    println!("done");
    let count = save_transcript(&transcript, srt)?;
    println!("Subtitles: {} ({} cues)", srt.display(), count);
    Ok(())
}

/// `<dir>/<video>_subtitled_<stamp>.mp4`
pub fn subtitled_output_path(dir: &Path, video: &Path, stamp: &str) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    dir.join(format!("{}_subtitled_{}.mp4", stem, stamp))
}

/// Handle `subtitles` actions.
pub async fn handle_subtitle_action(settings: &Settings, action: SubtitleAction) -> Result<(), String> {
    match action {
        SubtitleAction::Shift { file, seconds } => {
            subtitle::shift_file(&file, seconds).map_err(|e| e.to_string())?;
            println!("Shifted {} by {:+.3}s", file.display(), seconds);
        }
        SubtitleAction::Replace {
            file,
            find,
            replace,
        } => {
            let count = subtitle::replace_in_file(&file, &find, &replace).map_err(|e| e.to_string())?;
            println!("Replaced {} occurrence(s) in {}", count, file.display());
        }
        SubtitleAction::Generate {
            audio,
            output,
            model,
            language,
        } => {
            let output = output.unwrap_or_else(|| {
                transcript_output_path(&settings.output.audio_output_dir, &audio, &file_timestamp())
            });
            generate_srt(&audio, &output, &model, language.as_deref()).await?;
        }
        SubtitleAction::Burn { video, srt, output } => {
            let output = output.unwrap_or_else(|| {
                subtitled_output_path(&settings.output.audio_output_dir, &video, &file_timestamp())
            });
            if let Some(parent) = output.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| format!("Cannot create {}: {}", parent.display(), e))?;
                }
            }
            print!("Burning subtitles... ");
            flush();
            if let Err(e) = audio::burn_subtitles(&video, &srt, &output).await {
                println!("failed");
                return Err(e.to_string());
            }
            println!("done");
            println!("Saved: {}", output.display());
        }
    }
    Ok(())
}

/// Handle `image` actions. `auto` rewrites `config_path`.
pub async fn handle_image_action(action: ImageAction, config_path: &Path) -> Result<(), String> {
    match action {
        ImageAction::Check { path } => {
            let info = seed_image::inspect(&path).map_err(|e| e.to_string())?;
            println!("File:       {}", info.path.display());
            println!("Format:     {:?}", info.format);
            println!("Size:       {}", format_size(info.file_size));
            println!(
                "Dimensions: {}x{} (aspect {:.2})",
                info.width,
                info.height,
                info.aspect_ratio()
            );
            println!("OK: usable as a seed image");
        }
        ImageAction::Encode { path } => {
            let seed = tokio::task::spawn_blocking(move || SeedImage::from_file(&path))
                .await
                .map_err(|e| format!("Image task failed: {}", e))?
                .map_err(|e: SeedImageError| e.to_string())?;
            if let SeedImage::Embedded {
                data_url,
                width,
                height,
            } = &seed
            {
                println!("Encoded as {}x{} JPEG", width, height);
                println!("Data URL: {} characters", data_url.len());
                let head: String = data_url.chars().take(80).collect();
                println!("{}...", head);
            }
        }
        ImageAction::Auto { path } => {
            let info = seed_image::inspect(&path).map_err(|e| e.to_string())?;
            let abs = std::fs::canonicalize(&info.path)
                .map_err(|e| format!("Cannot resolve {}: {}", info.path.display(), e))?;
            let text = match std::fs::read_to_string(config_path) {
                Ok(text) => text,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => EXAMPLE_CONFIG.to_string(),
                Err(e) => return Err(format!("Cannot read {}: {}", config_path.display(), e)),
            };
            std::fs::write(config_path, set_image_file(&text, &abs))
                .map_err(|e| format!("Cannot write {}: {}", config_path.display(), e))?;
            println!("Updated {}", config_path.display());
            println!("  image_file={}", abs.display());
            println!("  {}x{}, {}", info.width, info.height, format_size(info.file_size));
        }
    }
    Ok(())
}

/// `webhook`: run the callback receiver until Ctrl+C.
pub async fn run_webhook(
    settings: &Settings,
    host: Option<String>,
    port: Option<u16>,
    shutdown: Shutdown,
) -> Result<(), String> {
    let host = host.unwrap_or_else(|| settings.webhook.host.clone());
    let port = port.unwrap_or(settings.webhook.port);
    let addr = format!("{}:{}", host, port);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Cannot listen on {}: {}", addr, e))?;
    let http = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
    let state = Arc::new(WebhookState::new(http, settings.output.videos_dir.clone()));

    println!("Webhook receiver listening on http://{}", addr);
    println!("  Callback URL: http://{}/webhook", addr);
    println!("  Videos are saved to {}", settings.output.videos_dir.display());
    println!("Press Ctrl+C to stop.");
    println!();

    webhook::serve(listener, state.clone(), shutdown)
        .await
        .map_err(|e| format!("Webhook server failed: {}", e))?;

    println!(
        "Webhook receiver stopped ({} callbacks, {} downloads)",
        state.received(),
        state.downloaded()
    );
    Ok(())
}
