//! Status polling loop.

use std::time::{Duration, Instant};

use crate::shutdown::Shutdown;

use super::backoff::next_delay;
use super::client::{ArkClient, ArkError};
use super::types::{TaskResponse, TaskStatus};

/// Timing rules for [`wait_for_video`].
///
/// The wait between polls starts at the interval for the current status and
/// grows by `backoff_factor` while the status stays the same, up to
/// `max_interval`. Polling stops at whichever comes first of `deadline` and
/// `max_polls`.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub queued_interval: Duration,
    pub running_interval: Duration,
    pub max_interval: Duration,
    pub backoff_factor: f64,
    pub deadline: Duration,
    pub max_polls: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            queued_interval: Duration::from_secs(5),
            running_interval: Duration::from_secs(10),
            max_interval: Duration::from_secs(30),
            backoff_factor: 1.5,
            deadline: Duration::from_secs(600),
            max_polls: 60,
        }
    }
}

impl PollPolicy {
    fn base_interval(&self, status: &TaskStatus) -> Duration {
        match status {
            TaskStatus::Queued => self.queued_interval,
            _ => self.running_interval,
        }
    }
}

/// Poll a task until it succeeds, fails, runs out of time, or is interrupted.
///
/// `on_update` sees every fetched task along with the 1-based poll number.
///
/// # Returns
///
/// The non-empty result video URL.
///
/// # Errors
///
/// - `ArkError::TaskFailed` when the service reports `failed`
/// - `ArkError::MissingField` when `succeeded` arrives without a video URL
/// - `ArkError::Timeout` when the deadline or poll cap is reached
/// - `ArkError::Cancelled` when the shutdown handle fires
/// - any transport or API error from the status request itself
pub async fn wait_for_video<F>(
    client: &ArkClient,
    task_id: &str,
    policy: &PollPolicy,
    shutdown: &Shutdown,
    mut on_update: F,
) -> Result<String, ArkError>
where
    F: FnMut(u32, &TaskResponse),
{
    let started = Instant::now();
    let mut last_status: Option<TaskStatus> = None;
    let mut streak: u32 = 0;

    for poll in 1..=policy.max_polls.max(1) {
        if shutdown.is_triggered() {
            return Err(ArkError::Cancelled {
                task_id: task_id.to_string(),
            });
        }

        let task = client.get_task(task_id).await?;
        on_update(poll, &task);

        let status = task.task_status();
        match status {
            TaskStatus::Succeeded => {
                return task
                    .video_url()
                    .map(str::to_string)
                    .ok_or(ArkError::MissingField("content.video_url"));
            }
            TaskStatus::Failed => {
                return Err(ArkError::TaskFailed {
                    code: task.error_code().to_string(),
                    message: task.error_message().to_string(),
                });
            }
            TaskStatus::Unknown(ref raw) => {
                log::debug!("Task {} reported unrecognised status '{}'", task_id, raw);
            }
            TaskStatus::Queued | TaskStatus::Running => {}
        }

        if last_status.as_ref() == Some(&status) {
            streak = streak.saturating_add(1);
        } else {
            streak = 0;
        }
        let delay = next_delay(
            streak,
            policy.base_interval(&status),
            policy.backoff_factor,
            policy.max_interval,
        );
        last_status = Some(status);

        let elapsed = started.elapsed();
        if poll == policy.max_polls || elapsed >= policy.deadline {
            break;
        }
        let delay = delay.min(policy.deadline - elapsed);
        log::debug!("Next status check for {} in {:?}", task_id, delay);

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.wait() => {
                return Err(ArkError::Cancelled {
                    task_id: task_id.to_string(),
                });
            }
        }
    }

    Err(ArkError::Timeout {
        task_id: task_id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = PollPolicy::default();
        assert_eq!(policy.queued_interval, Duration::from_secs(5));
        assert_eq!(policy.running_interval, Duration::from_secs(10));
        assert_eq!(policy.max_polls, 60);
        assert_eq!(policy.deadline, Duration::from_secs(600));
    }

    #[test]
    fn test_base_interval_by_status() {
        let policy = PollPolicy::default();
        assert_eq!(policy.base_interval(&TaskStatus::Queued), Duration::from_secs(5));
        assert_eq!(policy.base_interval(&TaskStatus::Running), Duration::from_secs(10));
        assert_eq!(
            policy.base_interval(&TaskStatus::Unknown("x".to_string())),
            Duration::from_secs(10)
        );
    }
}
