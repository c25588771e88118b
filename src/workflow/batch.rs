//! Batch runs: independent jobs over a range of prompts.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::VideoConfig;
use crate::context::Context;
use crate::prompts::PromptRange;
use crate::seed_image::SeedImage;

use super::job::{JobOutcome, JobState};
use super::runner::{file_timestamp, preview, run_job, video_path};

/// Result of a batch run, written to disk as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub start: usize,
    pub end: usize,
    pub started_at: String,
    pub finished_at: String,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub callback_pending: usize,
    /// True when Ctrl+C stopped the run before every prompt was tried.
    pub interrupted: bool,
    pub results: Vec<JobOutcome>,
}

impl BatchReport {
    fn new(range: PromptRange) -> Self {
        Self {
            start: range.start,
            end: range.end,
            started_at: chrono::Local::now().to_rfc3339(),
            finished_at: String::new(),
            succeeded: 0,
            failed: 0,
            timed_out: 0,
            callback_pending: 0,
            interrupted: false,
            results: Vec::new(),
        }
    }

    fn push(&mut self, outcome: JobOutcome) {
        match outcome.state {
            JobState::Succeeded => self.succeeded += 1,
            JobState::TimedOut => self.timed_out += 1,
            JobState::CallbackPending => self.callback_pending += 1,
            _ => self.failed += 1,
        }
        self.results.push(outcome);
    }

    fn finish(&mut self) {
        self.finished_at = chrono::Local::now().to_rfc3339();
    }

    /// `batch_report_<start>-<end>_<stamp>.json`
    pub fn file_name(&self, stamp: &str) -> String {
        format!("batch_report_{}-{}_{}.json", self.start, self.end, stamp)
    }

    /// Write the report into `dir`, returning the file path.
    pub fn write(&self, dir: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name(&file_timestamp()));
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

/// Run every prompt in `range` as its own job.
///
/// The same seed image, if any, is used for every prompt. A failed job does
/// not stop the batch; Ctrl+C does, after the current job.
pub async fn run_batch(
    ctx: &Context,
    config: &VideoConfig,
    prompts: &[String],
    range: PromptRange,
    seed: Option<&SeedImage>,
) -> BatchReport {
    let selected = range.select(prompts);
    let total = selected.len();
    let mut report = BatchReport::new(range);

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
        println!("[{}/{}] Prompt #{}: \"{}\"", n + 1, total, index, preview(prompt, 60));
        let dest = video_path(ctx.videos_dir(), &format!("batch_{:02}", index));
        let outcome = run_job(ctx, config, index, prompt, seed, &dest).await;
        report.push(outcome);
    }

    report.finish();
    report
}

/// Print a short per-run summary.
pub fn print_summary(results: &[JobOutcome]) {
    println!();
    println!("Summary:");
    for outcome in results {
        match (&outcome.file, &outcome.task_id) {
            (Some(file), _) => println!("  #{} {}: {}", outcome.index, outcome.state, file.display()),
            (None, Some(id)) => println!("  #{} {} (task {})", outcome.index, outcome.state, id),
            (None, None) => println!("  #{} {}", outcome.index, outcome.state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(index: usize, state: JobState) -> JobOutcome {
        JobOutcome {
            index,
            prompt: format!("p{}", index),
            task_id: Some(format!("t{}", index)),
            state,
            used_seed_image: false,
            file: None,
            error: None,
        }
    }

    #[test]
    fn test_report_counts() {
        let mut report = BatchReport::new(PromptRange { start: 2, end: 5 });
        report.push(outcome(2, JobState::Succeeded));
        report.push(outcome(3, JobState::Failed));
        report.push(outcome(4, JobState::TimedOut));
        report.push(outcome(5, JobState::CallbackPending));
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.timed_out, 1);
        assert_eq!(report.callback_pending, 1);
        assert_eq!(report.results.len(), 4);
    }

    #[test]
    fn test_report_file_name() {
        let report = BatchReport::new(PromptRange { start: 2, end: 4 });
        assert_eq!(
            report.file_name("20250101_120000"),
            "batch_report_2-4_20250101_120000.json"
        );
    }

    #[test]
    fn test_report_write() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = BatchReport::new(PromptRange { start: 1, end: 1 });
        report.push(outcome(1, JobState::Succeeded));
        report.finish();

        let path = report.write(dir.path()).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["start"], 1);
        assert_eq!(value["results"][0]["state"], "succeeded");
        assert_eq!(value["results"][0]["task_id"], "t1");
    }
}
