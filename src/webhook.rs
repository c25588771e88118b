//! Completion callback receiver.
//!
//! `POST /webhook` accepts the task payload the service pushes when a job
//! set up with `callback_url` finishes, and downloads succeeded videos.
//! `GET /` serves a small status page.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::ark::{download_to, TaskResponse, TaskStatus};
use crate::shutdown::Shutdown;
use crate::workflow::format_size;

pub struct WebhookState {
    http: reqwest::Client,
    output_dir: PathBuf,
    received: AtomicUsize,
    downloaded: AtomicUsize,
}

impl WebhookState {
    pub fn new(http: reqwest::Client, output_dir: PathBuf) -> Self {
        Self {
            http,
            output_dir,
            received: AtomicUsize::new(0),
            downloaded: AtomicUsize::new(0),
        }
    }

    pub fn received(&self) -> usize {
        self.received.load(Ordering::SeqCst)
    }

    pub fn downloaded(&self) -> usize {
        self.downloaded.load(Ordering::SeqCst)
    }
}

pub fn router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/", get(status_page))
        .route("/webhook", post(receive))
        .with_state(state)
}

/// Serve until the shutdown handle fires.
pub async fn serve(
    listener: TcpListener,
    state: Arc<WebhookState>,
    shutdown: Shutdown,
) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await
}

/// File name for a downloaded callback video.
pub fn webhook_file_name(task_id: &str, unix_secs: i64) -> String {
    let safe: String = task_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("webhook_{}_{}.mp4", safe, unix_secs)
}

async fn receive(State(state): State<Arc<WebhookState>>, Json(task): Json<TaskResponse>) -> Json<Value> {
    state.received.fetch_add(1, Ordering::SeqCst);

    println!("Callback received");
    println!("  Task ID: {}", task.id);
    println!("  Status:  {}", task.status);
    println!("  Model:   {}", task.model.as_deref().unwrap_or("-"));

    match task.task_status() {
        TaskStatus::Succeeded => match task.video_url() {
            Some(url) => {
                if let Some(tokens) = task.completion_tokens() {
                    println!("  Tokens:  {}", tokens);
                }
                let dest = state
                    .output_dir
                    .join(webhook_file_name(&task.id, chrono::Utc::now().timestamp()));
                match download_to(&state.http, url, &dest).await {
                    Ok(bytes) => {
                        state.downloaded.fetch_add(1, Ordering::SeqCst);
                        println!("  Saved:   {} ({})", dest.display(), format_size(bytes));
                    }
                    Err(e) => {
                        log::error!("Download for task {} failed: {}", task.id, e);
                        eprintln!("  Download failed: {}", e);
                    }
                }
            }
            None => eprintln!("  Succeeded without a video URL"),
        },
        TaskStatus::Failed => {
            println!("  Error:   [{}] {}", task.error_code(), task.error_message());
        }
        other => log::info!("Task {} reported {}", task.id, other),
    }
    println!();

    Json(json!({ "status": "received" }))
}

async fn status_page(State(state): State<Arc<WebhookState>>) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>ark-video webhook</title></head>
<body style="font-family: sans-serif; margin: 40px;">
<h1>ark-video webhook receiver</h1>
<p><strong>Running.</strong> Callbacks received: {received}, videos downloaded: {downloaded}.</p>
<p>Videos are saved to <code>{dir}</code>.</p>
<h2>Usage</h2>
<ol>
<li>Add <code>callback_url=http://&lt;this-host&gt;:&lt;port&gt;/webhook</code> to <code>config.txt</code></li>
<li>Run <code>ark-video --batch</code></li>
</ol>
<p>Endpoint: <code>POST /webhook</code>. Stop the server with Ctrl+C.</p>
</body>
</html>
"#,
        received = state.received(),
        downloaded = state.downloaded(),
        dir = state.output_dir.display(),
    ))
}
