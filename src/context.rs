//! Run context passed to every workflow.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use crate::ark::{ArkClient, PollPolicy};
use crate::settings::Settings;
use crate::shutdown::Shutdown;

/// Everything a generation run needs, built once per command.
#[derive(Debug, Clone)]
pub struct Context {
    pub client: ArkClient,
    pub settings: Settings,
    pub poll: PollPolicy,
    /// Pause between submissions in batch and chain runs.
    pub inter_job_delay: Duration,
    pub shutdown: Shutdown,
    /// Answer yes to every confirmation.
    pub assume_yes: bool,
}

impl Context {
    pub fn new(client: ArkClient, settings: Settings, shutdown: Shutdown, assume_yes: bool) -> Self {
        Self {
            poll: settings.poll.policy(),
            inter_job_delay: settings.batch.inter_job_delay(),
            client,
            settings,
            shutdown,
            assume_yes,
        }
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_inter_job_delay(mut self, delay: Duration) -> Self {
        self.inter_job_delay = delay;
        self
    }

    pub fn videos_dir(&self) -> &Path {
        &self.settings.output.videos_dir
    }

    /// Ask a yes/no question on the terminal.
    ///
    /// An empty answer or end of input picks `default_yes`.
    pub async fn confirm(&self, question: &str, default_yes: bool) -> bool {
        if self.assume_yes {
            return true;
        }
        confirm(question, default_yes).await
    }

    /// Sleep for the inter-job delay. Returns false if interrupted.
    pub async fn throttle(&self) -> bool {
        if self.inter_job_delay.is_zero() {
            return !self.shutdown.is_triggered();
        }
        tokio::select! {
            _ = tokio::time::sleep(self.inter_job_delay) => true,
            _ = self.shutdown.wait() => false,
        }
    }
}

/// Ask a yes/no question without a context.
pub async fn confirm(question: &str, default_yes: bool) -> bool {
    let answer = prompt_line(&format!(
        "{} {} ",
        question,
        if default_yes { "[Y/n]" } else { "[y/N]" }
    ))
    .await;
    parse_answer(answer.as_deref(), default_yes)
}

/// Print a prompt and read one line from stdin. `None` on end of input.
pub async fn prompt_line(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    std::io::stdout().flush().ok();

    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        match std::io::stdin().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    })
    .await
    .ok()
    .flatten()
}

fn parse_answer(answer: Option<&str>, default_yes: bool) -> bool {
    match answer.map(|a| a.trim().to_ascii_lowercase()) {
        Some(a) if a == "y" || a == "yes" => true,
        Some(a) if a == "n" || a == "no" => false,
        _ => default_yes,
    }
}
