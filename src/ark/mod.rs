//! Video generation API integration.
//!
//! Jobs are submitted to the content generation task endpoint, polled until
//! they reach a terminal status, and the resulting video is streamed to disk.

mod backoff;
mod client;
mod download;
mod poll;
mod types;

pub use backoff::next_delay;
pub use client::{
    build_request, validate_prompt, ArkClient, ArkError, ARK_API_BASE_URL, ARK_API_KEY_ENV,
    TASKS_PATH,
};
pub use download::{download_to, DOWNLOAD_TIMEOUT};
pub use poll::{wait_for_video, PollPolicy};
pub use types::{
    ContentItem, CreateTaskRequest, ImageUrl, TaskContent, TaskError, TaskListResponse,
    TaskResponse, TaskStatus, TaskUsage,
};
