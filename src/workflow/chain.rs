//! Chained runs: each clip's last frame seeds the next clip.

use std::path::PathBuf;

use crate::config::VideoConfig;
use crate::context::Context;
use crate::media::concat::concat_clips;
use crate::media::FrameSource;
use crate::prompts::PromptRange;
use crate::seed_image::SeedImage;

use super::job::JobOutcome;
use super::runner::{preview, run_job, video_path};

#[derive(Debug, Clone, Default)]
pub struct ChainReport {
    pub results: Vec<JobOutcome>,
    pub interrupted: bool,
}

impl ChainReport {
    /// Downloaded clips in prompt order.
    pub fn clips(&self) -> Vec<PathBuf> {
        self.results
            .iter()
            .filter(|o| o.is_success())
            .filter_map(|o| o.file.clone())
            .collect()
    }
}

/// Run the prompts in `range` as a chain.
///
/// The first job uses `initial_seed`. After each successful download the
/// clip's last frame becomes the next seed; when any stage fails the seed is
/// dropped and the next prompt runs text-only.
pub async fn run_chain<F: FrameSource>(
    ctx: &Context,
    config: &VideoConfig,
    prompts: &[String],
    range: PromptRange,
    initial_seed: Option<SeedImage>,
    frames: &F,
) -> ChainReport {
    let chain_config;
    let config = if config.callback_url.is_some() {
        log::warn!("Chain mode needs every clip locally; ignoring callback_url");
        chain_config = VideoConfig {
            callback_url: None,
            ..config.clone()
        };
        &chain_config
    } else {
        config
    };

    let selected = range.select(prompts);
    let total = selected.len();
    let mut report = ChainReport::default();
    let mut seed = initial_seed;

    for (n, (index, prompt)) in selected.into_iter().enumerate() {
        if n > 0 && !ctx.throttle().await {
            report.interrupted = true;
            break;
        }
        if ctx.shutdown.is_triggered() {
            report.interrupted = true;
            break;
        }

        println!();
        println!(
            "[{}/{}] Prompt #{} ({}): \"{}\"",
            n + 1,
            total,
            index,
            if seed.is_some() { "image + text" } else { "text only" },
            preview(prompt, 60)
        );
        let dest = video_path(ctx.videos_dir(), &format!("chain_{:02}", index));
        let outcome = run_job(ctx, config, index, prompt, seed.as_ref(), &dest).await;

        seed = match (&outcome.file, outcome.is_success()) {
            (Some(file), true) => match frames.last_frame(file).await {
                Ok(next) => {
                    println!("  Last frame will seed the next clip");
                    Some(next)
                }
                Err(e) => {
                    eprintln!("    Could not use last frame: {}", e);
                    println!("  Next clip continues text-only");
                    None
                }
            },
            _ => {
                if n + 1 < total {
                    println!("  Next clip continues text-only");
                }
                None
            }
        };

        report.results.push(outcome);
    }

    report
}

/// Offer to join the chain's clips into one video.
///
/// Returns the combined file when the user agreed and ffmpeg succeeded.
pub async fn offer_concat(ctx: &Context, report: &ChainReport) -> Option<PathBuf> {
    let clips = report.clips();
    if clips.len() < 2 {
        return None;
    }

    let question = format!("Concatenate {} clips into one video?", clips.len());
    if !ctx.confirm(&question, true).await {
        return None;
    }

    let output = video_path(ctx.videos_dir(), "chain_combined");
    print!("Concatenating... ");
    std::io::Write::flush(&mut std::io::stdout()).ok();
    match concat_clips(&clips, &output).await {
        Ok(path) => {
            println!("done");
            println!("  Saved: {}", path.display());
            Some(path)
        }
        Err(e) => {
            println!("failed");
            eprintln!("    {}", e);
            None
        }
    }
}
