//! Request and response bodies for the content generation task endpoints.

use serde::{Deserialize, Serialize};

/// Request body for `POST /api/v3/contents/generations/tasks`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateTaskRequest {
    pub model: String,
    pub content: Vec<ContentItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

/// One entry of the request `content` array.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Response from task creation.
#[derive(Debug, Deserialize)]
pub struct CreateTaskResponse {
    #[serde(default)]
    pub id: Option<String>,
}

/// A task as returned by the get/list endpoints and by completion callbacks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<TaskContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TaskUsage>,
    /// Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskContent {
    #[serde(default)]
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskUsage {
    #[serde(default)]
    pub completion_tokens: Option<u64>,
}

/// Response from `GET /api/v3/contents/generations/tasks`.
#[derive(Debug, Default, Deserialize)]
pub struct TaskListResponse {
    #[serde(default)]
    pub items: Vec<TaskResponse>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// Remote task status.
///
/// Anything the service reports that is not one of the four known states is
/// kept verbatim in `Unknown` and treated as still in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Unknown(String),
}

impl TaskStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "queued" => TaskStatus::Queued,
            "running" => TaskStatus::Running,
            "succeeded" => TaskStatus::Succeeded,
            "failed" => TaskStatus::Failed,
            _ => TaskStatus::Unknown(raw.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Queued => write!(f, "queued"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Succeeded => write!(f, "succeeded"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Unknown(s) => write!(f, "{}", s),
        }
    }
}

impl TaskResponse {
    pub fn task_status(&self) -> TaskStatus {
        TaskStatus::parse(&self.status)
    }

    /// The result URL, if present and non-empty.
    pub fn video_url(&self) -> Option<&str> {
        self.content
            .as_ref()
            .and_then(|c| c.video_url.as_deref())
            .filter(|url| !url.trim().is_empty())
    }

    pub fn error_code(&self) -> &str {
        self.error
            .as_ref()
            .and_then(|e| e.code.as_deref())
            .unwrap_or("unknown")
    }

    pub fn error_message(&self) -> &str {
        self.error
            .as_ref()
            .and_then(|e| e.message.as_deref())
            .unwrap_or("no error message")
    }

    pub fn completion_tokens(&self) -> Option<u64> {
        self.usage.as_ref().and_then(|u| u.completion_tokens)
    }
}
