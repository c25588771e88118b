//! Generation jobs and their outcomes.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::ark::{TaskResponse, TaskStatus};
use crate::seed_image::SeedImage;

/// Local lifecycle of one job.
///
/// `Created -> Submitted -> Polling -> {Succeeded | Failed | TimedOut}`, or
/// `Submitted -> CallbackPending` when completion is pushed to a webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Created,
    Submitted,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
    CallbackPending,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::TimedOut | JobState::CallbackPending
        )
    }

    fn can_move_to(&self, next: JobState) -> bool {
        use JobState::*;
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (Created, Submitted) | (Created, Failed) => true,
            (Submitted, Polling) | (Submitted, CallbackPending) | (Submitted, Failed) => true,
            (Polling, Polling) | (Polling, Succeeded) | (Polling, Failed) | (Polling, TimedOut) => {
                true
            }
            _ => false,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Created => "created",
            JobState::Submitted => "submitted",
            JobState::Polling => "polling",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
            JobState::TimedOut => "timed_out",
            JobState::CallbackPending => "callback_pending",
        };
        f.write_str(s)
    }
}

/// One request to the remote service.
///
/// `status` and `result_asset_url` only ever change by applying a task
/// fetched from the service.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub id: Option<String>,
    pub prompt: String,
    pub seed_image: Option<SeedImage>,
    pub status: Option<TaskStatus>,
    pub result_asset_url: Option<String>,
    state: JobState,
}

impl GenerationJob {
    pub fn new(prompt: impl Into<String>, seed_image: Option<SeedImage>) -> Self {
        Self {
            id: None,
            prompt: prompt.into(),
            seed_image,
            status: None,
            result_asset_url: None,
            state: JobState::Created,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Move to `next`. Illegal transitions are logged and ignored.
    pub fn transition(&mut self, next: JobState) {
        if self.state.can_move_to(next) {
            self.state = next;
        } else {
            log::warn!(
                "Ignoring job transition {} -> {} for {:?}",
                self.state,
                next,
                self.id
            );
        }
    }

    pub fn mark_submitted(&mut self, id: String) {
        self.id = Some(id);
        self.transition(JobState::Submitted);
    }

    /// Record a freshly fetched task.
    pub fn apply(&mut self, task: &TaskResponse) {
        let status = task.task_status();
        self.result_asset_url = match status {
            TaskStatus::Succeeded => task.video_url().map(str::to_string),
            _ => None,
        };
        self.status = Some(status);
        if self.state == JobState::Submitted {
            self.transition(JobState::Polling);
        }
    }
}

/// What happened to one prompt in a single, batch or chain run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobOutcome {
    /// 1-based position in the prompt file.
    pub index: usize,
    pub prompt: String,
    pub task_id: Option<String>,
    pub state: JobState,
    pub used_seed_image: bool,
    pub file: Option<PathBuf>,
    pub error: Option<String>,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        self.state == JobState::Succeeded && self.file.is_some()
    }
}
