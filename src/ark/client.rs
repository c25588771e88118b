//! ArkClient - handles communication with the content generation API.

use std::path::Path;
use std::time::Duration;

use crate::config::VideoConfig;
use crate::seed_image::{SeedImage, SeedImageError};

use super::backoff::parse_retry_after;
use super::download::download_to;
use super::types::{
    ContentItem, CreateTaskRequest, CreateTaskResponse, ImageUrl, TaskListResponse, TaskResponse,
};

/// The environment variable name for the API key.
pub const ARK_API_KEY_ENV: &str = "ARK_API_KEY";

/// Default base URL for the API.
pub const ARK_API_BASE_URL: &str = "https://ark.ap-southeast.bytepluses.com";

/// Path of the task collection, relative to the base URL.
pub const TASKS_PATH: &str = "/api/v3/contents/generations/tasks";

/// Default timeout for HTTP requests (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP status code for rate limiting.
const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Validate a prompt before sending to the API.
pub fn validate_prompt(prompt: &str) -> Result<(), ArkError> {
    if prompt.trim().is_empty() {
        return Err(ArkError::EmptyPrompt);
    }
    Ok(())
}

/// Build the request body for one generation job.
///
/// Generation parameters ride along in the text prompt as command flags. The
/// model variant depends on whether a seed image is attached.
pub fn build_request(
    prompt: &str,
    seed: Option<&SeedImage>,
    config: &VideoConfig,
) -> CreateTaskRequest {
    let has_image = seed.is_some();
    let text = format!("{} {}", prompt.trim(), config.prompt_flags(has_image));

    let mut content = vec![ContentItem::Text { text }];
    if let Some(seed) = seed {
        content.push(ContentItem::ImageUrl {
            image_url: ImageUrl {
                url: seed.url().to_string(),
            },
        });
    }

    CreateTaskRequest {
        model: config.model_id(has_image).to_string(),
        content,
        callback_url: config.callback_url.clone(),
    }
}

/// Client for communicating with the task API.
#[derive(Clone)]
pub struct ArkClient {
    api_key: String,
    base_url: String,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for ArkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArkClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ArkClient {
    /// Create a new ArkClient by reading the API key from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ArkError::MissingApiKey` if `ARK_API_KEY` is not set or empty.
    pub fn new() -> Result<Self, ArkError> {
        let api_key = std::env::var(ARK_API_KEY_ENV).map_err(|_| ArkError::MissingApiKey)?;
        Self::with_api_key(api_key)
    }

    /// Create a new ArkClient with an explicit API key.
    pub fn with_api_key(api_key: String) -> Result<Self, ArkError> {
        Self::with_base_url(api_key, ARK_API_BASE_URL.to_string())
    }

    /// Create a new ArkClient with a custom base URL.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, ArkError> {
        if api_key.trim().is_empty() {
            return Err(ArkError::MissingApiKey);
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn tasks_url(&self) -> String {
        format!("{}{}", self.base_url, TASKS_PATH)
    }

    /// Submit one generation job.
    ///
    /// # Arguments
    ///
    /// * `prompt` - The text prompt describing the video
    /// * `seed` - Optional seed image, embedded or remote
    /// * `config` - Generation parameters
    ///
    /// # Returns
    ///
    /// The server-issued task id.
    ///
    /// # Errors
    ///
    /// Returns `ArkError::EmptyPrompt` if the prompt is blank, and otherwise
    /// whatever `submit_task` returns.
    pub async fn submit_generation(
        &self,
        prompt: &str,
        seed: Option<&SeedImage>,
        config: &VideoConfig,
    ) -> Result<String, ArkError> {
        validate_prompt(prompt)?;
        let request = build_request(prompt, seed, config);
        self.submit_task(&request).await
    }

    /// POST a prepared request body.
    ///
    /// # Errors
    ///
    /// Returns `ArkError::RateLimit` on a 429 response, `ArkError::Api` for any
    /// other non-2xx response, `ArkError::MissingField` if the response has no
    /// `id`, or `ArkError::Http` if the request fails.
    pub async fn submit_task(&self, request: &CreateTaskRequest) -> Result<String, ArkError> {
        log::info!(
            "Submitting task: model={} image={}",
            request.model,
            request
                .content
                .iter()
                .any(|c| matches!(c, ContentItem::ImageUrl { .. }))
        );

        let response = self
            .http_client
            .post(self.tasks_url())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();

            if status.as_u16() == HTTP_STATUS_TOO_MANY_REQUESTS {
                let retry_after_secs = parse_retry_after(&response);
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Rate limit exceeded".to_string());
                log::warn!("Rate limited. Retry-After: {:?} seconds", retry_after_secs);
                return Err(ArkError::RateLimit {
                    message: error_text,
                    retry_after_secs,
                });
            }

            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ArkError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let body: CreateTaskResponse = response.json().await?;
        match body.id {
            Some(id) if !id.trim().is_empty() => Ok(id),
            _ => Err(ArkError::MissingField("id")),
        }
    }

    /// Fetch the current state of a task.
    ///
    /// # Errors
    ///
    /// Returns `ArkError::Api` for a non-2xx response or `ArkError::Http` if
    /// the request or JSON decoding fails.
    pub async fn get_task(&self, task_id: &str) -> Result<TaskResponse, ArkError> {
        let url = format!("{}/{}", self.tasks_url(), task_id);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ArkError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        Ok(response.json().await?)
    }

    /// List the most recent tasks.
    pub async fn list_tasks(
        &self,
        page_num: u32,
        page_size: u32,
    ) -> Result<TaskListResponse, ArkError> {
        let response = self
            .http_client
            .get(self.tasks_url())
            .bearer_auth(&self.api_key)
            .query(&[("page_num", page_num), ("page_size", page_size)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ArkError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        Ok(response.json().await?)
    }

    /// Download a finished video to `dest`, returning the byte count.
    pub async fn download_video(&self, url: &str, dest: &Path) -> Result<u64, ArkError> {
        download_to(&self.http_client, url, dest).await
    }
}

/// Errors that can occur while talking to the task API.
#[derive(Debug, thiserror::Error)]
pub enum ArkError {
    #[error("API key not configured. Set ARK_API_KEY in the environment or in a .env file")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited: {message}")]
    RateLimit {
        message: String,
        /// Retry-After header value in seconds, if provided
        retry_after_secs: Option<u64>,
    },

    #[error("Response is missing the '{0}' field")]
    MissingField(&'static str),

    #[error("Generation failed [{code}]: {message}")]
    TaskFailed { code: String, message: String },

    #[error("Task {task_id} did not finish in time; check it later with --check {task_id}")]
    Timeout { task_id: String },

    #[error("Stopped waiting for task {task_id}; check it later with --check {task_id}")]
    Cancelled { task_id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SeedImage(#[from] SeedImageError),

    #[error("Empty prompt")]
    EmptyPrompt,
}
