//! End-to-end tests for the webhook receiver.
//!
//! The receiver runs on an ephemeral port; a wiremock server hosts the
//! finished video it is told to download.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ark_video::shutdown::{self, ShutdownTrigger};
use ark_video::webhook::{serve, WebhookState};

struct Receiver {
    addr: SocketAddr,
    state: Arc<WebhookState>,
    trigger: ShutdownTrigger,
    handle: tokio::task::JoinHandle<std::io::Result<()>>,
}

async fn start_receiver(output_dir: PathBuf) -> Receiver {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(WebhookState::new(reqwest::Client::new(), output_dir));
    let (trigger, handle) = shutdown::channel();
    let handle = tokio::spawn(serve(listener, state.clone(), handle));
    Receiver {
        addr,
        state,
        trigger,
        handle,
    }
}

async fn stop(receiver: Receiver) {
    receiver.trigger.trigger();
    tokio::time::timeout(Duration::from_secs(5), receiver.handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

fn mp4_files(dir: &std::path::Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|e| e == "mp4"))
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn test_succeeded_callback_downloads_video() {
    let assets = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/videos/done.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"video-bytes".to_vec()))
        .expect(1)
        .mount(&assets)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("videos");
    let receiver = start_receiver(out.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/webhook", receiver.addr))
        .json(&json!({
            "id": "cgt-42",
            "model": "seedance-1-0-lite-t2v-250428",
            "status": "succeeded",
            "content": { "video_url": format!("{}/videos/done.mp4", assets.uri()) },
            "usage": { "completion_tokens": 108900 }
        }))
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "status": "received" }));

    let files = mp4_files(&out);
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("webhook_cgt-42_"));
    assert_eq!(std::fs::read(&files[0]).unwrap(), b"video-bytes");
    assert_eq!(receiver.state.received(), 1);
    assert_eq!(receiver.state.downloaded(), 1);

    stop(receiver).await;
}

#[tokio::test]
async fn test_failed_callback_is_acknowledged_without_download() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("videos");
    let receiver = start_receiver(out.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/webhook", receiver.addr))
        .json(&json!({
            "id": "cgt-43",
            "status": "failed",
            "error": { "code": "InputTextSensitiveContentDetected", "message": "blocked" }
        }))
        .send()
        .await
        .unwrap();

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "received");
    assert!(mp4_files(&out).is_empty());
    assert_eq!(receiver.state.received(), 1);
    assert_eq!(receiver.state.downloaded(), 0);

    stop(receiver).await;
}

#[tokio::test]
async fn test_broken_download_still_acknowledged() {
    let assets = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&assets)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let receiver = start_receiver(dir.path().join("videos")).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/webhook", receiver.addr))
        .json(&json!({
            "id": "cgt-44",
            "status": "succeeded",
            "content": { "video_url": format!("{}/missing.mp4", assets.uri()) }
        }))
        .send()
        .await
        .unwrap();

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "received");
    assert_eq!(receiver.state.downloaded(), 0);

    stop(receiver).await;
}

#[tokio::test]
async fn test_status_page_reports_counts() {
    let dir = tempfile::tempdir().unwrap();
    let receiver = start_receiver(dir.path().join("videos")).await;

    reqwest::Client::new()
        .post(format!("http://{}/webhook", receiver.addr))
        .json(&json!({ "id": "cgt-45", "status": "running" }))
        .send()
        .await
        .unwrap();

    let response = reqwest::get(format!("http://{}/", receiver.addr)).await.unwrap();
    assert!(response.status().is_success());
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/html"));
    let html = response.text().await.unwrap();
    assert!(html.contains("Callbacks received: 1"));
    assert!(html.contains("POST /webhook"));

    stop(receiver).await;
}

#[tokio::test]
async fn test_server_stops_on_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let receiver = start_receiver(dir.path().join("videos")).await;
    let addr = receiver.addr;
    stop(receiver).await;

    assert!(reqwest::get(format!("http://{}/", addr)).await.is_err());
}
