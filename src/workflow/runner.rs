//! Submit, poll and download one job.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::ark::{wait_for_video, ArkError};
use crate::config::VideoConfig;
use crate::context::Context;
use crate::seed_image::SeedImage;

use super::job::{GenerationJob, JobOutcome, JobState};

/// Timestamp used in generated file names.
pub fn file_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Destination for a generated clip: `<dir>/<prefix>_<stamp>.mp4`.
pub fn video_path(dir: &Path, prefix: &str) -> PathBuf {
    dir.join(format!("{}_{}.mp4", prefix, file_timestamp()))
}

pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Shorten a prompt for progress lines.
pub fn preview(prompt: &str, max_chars: usize) -> String {
    let mut chars = prompt.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

fn flush() {
    std::io::stdout().flush().ok();
}

/// Run one job to completion and report what happened.
///
/// Errors are printed and recorded in the outcome rather than returned, so
/// batch and chain runs can carry on with the next prompt.
pub async fn run_job(
    ctx: &Context,
    config: &VideoConfig,
    index: usize,
    prompt: &str,
    seed: Option<&SeedImage>,
    dest: &Path,
) -> JobOutcome {
    let mut job = GenerationJob::new(prompt, seed.cloned());
    let result = drive(ctx, config, &mut job, dest).await;

    let (file, error) = match result {
        Ok(file) => (file, None),
        Err(e) => {
            let next = match e {
                ArkError::Timeout { .. } => JobState::TimedOut,
                _ => JobState::Failed,
            };
            job.transition(next);
            eprintln!("    Failed: {}", e);
            (None, Some(e.to_string()))
        }
    };

    JobOutcome {
        index,
        prompt: job.prompt.clone(),
        task_id: job.id.clone(),
        state: job.state(),
        used_seed_image: job.seed_image.is_some(),
        file,
        error,
    }
}

async fn drive(
    ctx: &Context,
    config: &VideoConfig,
    job: &mut GenerationJob,
    dest: &Path,
) -> Result<Option<PathBuf>, ArkError> {
    print!("  Submitting... ");
    flush();
    let submitted = ctx
        .client
        .submit_generation(&job.prompt, job.seed_image.as_ref(), config)
        .await;
    let task_id = match submitted {
        Ok(id) => id,
        Err(e) => {
            println!("failed");
            return Err(e);
        }
    };
    println!("done");
    println!("  Task ID: {}", task_id);
    job.mark_submitted(task_id.clone());

    if let Some(callback) = &config.callback_url {
        job.transition(JobState::CallbackPending);
        println!("  Result will be delivered to {}", callback);
        return Ok(None);
    }

    let video_url = wait_for_video(&ctx.client, &task_id, &ctx.poll, &ctx.shutdown, |poll, task| {
        job.apply(task);
        println!("  [poll {}] status: {}", poll, task.task_status());
    })
    .await?;

    print!("  Downloading... ");
    flush();
    match ctx.client.download_video(&video_url, dest).await {
        Ok(bytes) => {
            println!("done ({})", format_size(bytes));
            println!("  Saved: {}", dest.display());
            job.transition(JobState::Succeeded);
            Ok(Some(dest.to_path_buf()))
        }
        Err(e) => {
            println!("failed");
            Err(e)
        }
    }
}
