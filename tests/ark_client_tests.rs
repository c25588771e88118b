//! Mock HTTP tests for ArkClient and the status poller.
//!
//! These tests cover:
//! - Client creation
//! - Task submission (headers, body, error mapping)
//! - Task lookup and listing
//! - Streaming download
//! - Poll loop outcomes (success, failure, timeout, cancellation)

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ark_video::ark::{
    wait_for_video, ArkClient, ArkError, PollPolicy, TaskStatus, ARK_API_BASE_URL, TASKS_PATH,
};
use ark_video::config::{Ratio, VideoConfig, MODEL_LITE_I2V, MODEL_LITE_T2V};
use ark_video::seed_image::SeedImage;
use ark_video::shutdown::{self, Shutdown};

fn client_for(server: &MockServer) -> ArkClient {
    ArkClient::with_base_url("test-key".to_string(), server.uri()).unwrap()
}

fn task_path(id: &str) -> String {
    format!("{}/{}", TASKS_PATH, id)
}

fn fast_policy(max_polls: u32) -> PollPolicy {
    PollPolicy {
        queued_interval: Duration::from_millis(10),
        running_interval: Duration::from_millis(10),
        max_interval: Duration::from_millis(20),
        backoff_factor: 1.5,
        deadline: Duration::from_secs(10),
        max_polls,
    }
}

async fn mount_status_once(server: &MockServer, id: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(task_path(id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

// === Client Creation Tests ===

#[test]
fn test_with_api_key_uses_default_base_url() {
    let client = ArkClient::with_api_key("k".to_string()).unwrap();
    assert_eq!(client.base_url(), ARK_API_BASE_URL);
}

#[test]
fn test_empty_api_key_is_rejected() {
    assert!(matches!(
        ArkClient::with_api_key("  ".to_string()),
        Err(ArkError::MissingApiKey)
    ));
}

#[test]
fn test_base_url_trailing_slash_trimmed() {
    let client = ArkClient::with_base_url("k".to_string(), "http://localhost:1234/".to_string()).unwrap();
    assert_eq!(client.base_url(), "http://localhost:1234");
}

#[test]
fn test_debug_hides_api_key() {
    let client = ArkClient::with_api_key("secret-key".to_string()).unwrap();
    assert!(!format!("{:?}", client).contains("secret-key"));
}

// === Submission Tests ===

#[tokio::test]
async fn test_submit_sends_bearer_token_and_text_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TASKS_PATH))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "cgt-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let id = client_for(&server)
        .submit_generation("a cat on a boat", None, &VideoConfig::default())
        .await
        .unwrap();
    assert_eq!(id, "cgt-1");

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["model"], MODEL_LITE_T2V);
    assert_eq!(body["content"].as_array().unwrap().len(), 1);
    assert_eq!(body["content"][0]["type"], "text");
    let text = body["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("a cat on a boat --resolution 720p --ratio 16:9"));
    assert!(body.get("callback_url").is_none());
}

#[tokio::test]
async fn test_submit_with_seed_image_uses_image_model_and_adaptive_ratio() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TASKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "cgt-2"})))
        .mount(&server)
        .await;

    let config = VideoConfig {
        ratio: Ratio::R9x16,
        callback_url: Some("http://example.com/webhook".to_string()),
        ..VideoConfig::default()
    };
    let seed = SeedImage::Url("https://example.com/seed.png".to_string());
    client_for(&server)
        .submit_generation("sunrise", Some(&seed), &config)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["model"], MODEL_LITE_I2V);
    assert!(body["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("--ratio adaptive"));
    assert_eq!(body["content"][1]["type"], "image_url");
    assert_eq!(body["content"][1]["image_url"]["url"], "https://example.com/seed.png");
    assert_eq!(body["callback_url"], "http://example.com/webhook");
}

#[tokio::test]
async fn test_submit_rejects_empty_prompt_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = client_for(&server)
        .submit_generation("   ", None, &VideoConfig::default())
        .await;
    assert!(matches!(result, Err(ArkError::EmptyPrompt)));
}

#[tokio::test]
async fn test_submit_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TASKS_PATH))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "7")
                .set_body_string("slow down"),
        )
        .mount(&server)
        .await;

    let result = client_for(&server)
        .submit_generation("prompt", None, &VideoConfig::default())
        .await;
    match result {
        Err(ArkError::RateLimit {
            message,
            retry_after_secs,
        }) => {
            assert_eq!(message, "slow down");
            assert_eq!(retry_after_secs, Some(7));
        }
        other => panic!("Expected RateLimit, got {:?}", other),
    }
}

#[tokio::test]
async fn test_submit_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TASKS_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .submit_generation("prompt", None, &VideoConfig::default())
        .await;
    match result {
        Err(ArkError::Api { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "bad request");
        }
        other => panic!("Expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_submit_missing_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TASKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .submit_generation("prompt", None, &VideoConfig::default())
        .await;
    assert!(matches!(result, Err(ArkError::MissingField("id"))));
}

// === Lookup Tests ===

#[tokio::test]
async fn test_get_task_parses_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(task_path("cgt-9")))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cgt-9",
            "model": "seedance-1-0-pro-250528",
            "status": "succeeded",
            "content": {"video_url": "https://cdn.example.com/v.mp4"},
            "usage": {"completion_tokens": 246000},
            "created_at": 1700000000
        })))
        .mount(&server)
        .await;

    let task = client_for(&server).get_task("cgt-9").await.unwrap();
    assert_eq!(task.task_status(), TaskStatus::Succeeded);
    assert_eq!(task.video_url(), Some("https://cdn.example.com/v.mp4"));
    assert_eq!(task.completion_tokens(), Some(246000));
    assert_eq!(task.created_at, Some(1700000000));
}

#[tokio::test]
async fn test_get_task_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(task_path("missing")))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let result = client_for(&server).get_task("missing").await;
    assert!(matches!(result, Err(ArkError::Api { status: 404, .. })));
}

#[tokio::test]
async fn test_list_tasks_sends_paging() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TASKS_PATH))
        .and(query_param("page_num", "1"))
        .and(query_param("page_size", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"id": "cgt-a", "status": "running"},
                {"id": "cgt-b", "status": "failed", "error": {"code": "E1", "message": "blocked"}}
            ],
            "total": 42
        })))
        .expect(1)
        .mount(&server)
        .await;

    let list = client_for(&server).list_tasks(1, 5).await.unwrap();
    assert_eq!(list.items.len(), 2);
    assert_eq!(list.total, Some(42));
    assert_eq!(list.items[0].task_status(), TaskStatus::Running);
    assert_eq!(list.items[1].error_code(), "E1");
    assert_eq!(list.items[1].error_message(), "blocked");
}

// === Download Tests ===

#[tokio::test]
async fn test_download_video_writes_file_and_creates_dirs() {
    let server = MockServer::start().await;
    let bytes = vec![7u8; 4096];
    Mock::given(method("GET"))
        .and(path("/assets/v.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes.clone()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("nested").join("out.mp4");
    let url = format!("{}/assets/v.mp4", server.uri());

    let written = client_for(&server).download_video(&url, &dest).await.unwrap();
    assert_eq!(written, 4096);
    assert_eq!(std::fs::read(&dest).unwrap(), bytes);
}

#[tokio::test]
async fn test_download_video_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assets/gone.mp4"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let url = format!("{}/assets/gone.mp4", server.uri());
    let result = client_for(&server)
        .download_video(&url, &dir.path().join("x.mp4"))
        .await;
    match result {
        Err(ArkError::Api { status, message }) => {
            assert_eq!(status, 404);
            assert!(message.starts_with("Video download failed"));
        }
        other => panic!("Expected Api error, got {:?}", other),
    }
}

// === Poll Loop Tests ===

#[tokio::test]
async fn test_poll_walks_statuses_until_success() {
    let server = MockServer::start().await;
    mount_status_once(&server, "t1", json!({"id": "t1", "status": "queued"})).await;
    mount_status_once(&server, "t1", json!({"id": "t1", "status": "running"})).await;
    mount_status_once(
        &server,
        "t1",
        json!({"id": "t1", "status": "succeeded", "content": {"video_url": "https://cdn/v.mp4"}}),
    )
    .await;

    let mut seen = Vec::new();
    let url = wait_for_video(
        &client_for(&server),
        "t1",
        &fast_policy(10),
        &Shutdown::never(),
        |poll, task| seen.push((poll, task.task_status())),
    )
    .await
    .unwrap();

    assert_eq!(url, "https://cdn/v.mp4");
    assert_eq!(
        seen,
        vec![
            (1, TaskStatus::Queued),
            (2, TaskStatus::Running),
            (3, TaskStatus::Succeeded)
        ]
    );
}

#[tokio::test]
async fn test_poll_success_without_video_url_fails() {
    let server = MockServer::start().await;
    mount_status_once(&server, "t2", json!({"id": "t2", "status": "succeeded"})).await;

    let result = wait_for_video(
        &client_for(&server),
        "t2",
        &fast_policy(10),
        &Shutdown::never(),
        |_, _| {},
    )
    .await;
    assert!(matches!(result, Err(ArkError::MissingField("content.video_url"))));
}

#[tokio::test]
async fn test_poll_success_with_empty_video_url_fails() {
    let server = MockServer::start().await;
    mount_status_once(
        &server,
        "t3",
        json!({"id": "t3", "status": "succeeded", "content": {"video_url": ""}}),
    )
    .await;

    let result = wait_for_video(
        &client_for(&server),
        "t3",
        &fast_policy(10),
        &Shutdown::never(),
        |_, _| {},
    )
    .await;
    assert!(matches!(result, Err(ArkError::MissingField(_))));
}

#[tokio::test]
async fn test_poll_failed_status_reports_error() {
    let server = MockServer::start().await;
    mount_status_once(
        &server,
        "t4",
        json!({
            "id": "t4",
            "status": "failed",
            "error": {"code": "OutputVideoSensitiveContentDetected", "message": "blocked"}
        }),
    )
    .await;

    let result = wait_for_video(
        &client_for(&server),
        "t4",
        &fast_policy(10),
        &Shutdown::never(),
        |_, _| {},
    )
    .await;
    match result {
        Err(ArkError::TaskFailed { code, message }) => {
            assert_eq!(code, "OutputVideoSensitiveContentDetected");
            assert_eq!(message, "blocked");
        }
        other => panic!("Expected TaskFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_poll_unknown_status_keeps_waiting() {
    let server = MockServer::start().await;
    mount_status_once(&server, "t5", json!({"id": "t5", "status": "preprocessing"})).await;
    mount_status_once(
        &server,
        "t5",
        json!({"id": "t5", "status": "succeeded", "content": {"video_url": "https://cdn/5.mp4"}}),
    )
    .await;

    let url = wait_for_video(
        &client_for(&server),
        "t5",
        &fast_policy(10),
        &Shutdown::never(),
        |_, _| {},
    )
    .await
    .unwrap();
    assert_eq!(url, "https://cdn/5.mp4");
}

#[tokio::test]
async fn test_poll_gives_up_at_poll_cap() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(task_path("t6")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "t6", "status": "running"})))
        .expect(3)
        .mount(&server)
        .await;

    let result = wait_for_video(
        &client_for(&server),
        "t6",
        &fast_policy(3),
        &Shutdown::never(),
        |_, _| {},
    )
    .await;
    match result {
        Err(err @ ArkError::Timeout { .. }) => {
            assert!(err.to_string().contains("--check t6"));
        }
        other => panic!("Expected Timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_poll_gives_up_at_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(task_path("t7")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "t7", "status": "queued"})))
        .mount(&server)
        .await;

    let policy = PollPolicy {
        deadline: Duration::from_millis(50),
        max_polls: 1000,
        ..fast_policy(1000)
    };
    let result = wait_for_video(&client_for(&server), "t7", &policy, &Shutdown::never(), |_, _| {}).await;
    assert!(matches!(result, Err(ArkError::Timeout { .. })));
}

#[tokio::test]
async fn test_poll_transport_error_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(task_path("t8")))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let result = wait_for_video(
        &client_for(&server),
        "t8",
        &fast_policy(10),
        &Shutdown::never(),
        |_, _| {},
    )
    .await;
    assert!(matches!(result, Err(ArkError::Api { status: 500, .. })));
}

#[tokio::test]
async fn test_poll_cancelled_before_first_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (trigger, handle) = shutdown::channel();
    trigger.trigger();
    let result = wait_for_video(&client_for(&server), "t9", &fast_policy(10), &handle, |_, _| {}).await;
    assert!(matches!(result, Err(ArkError::Cancelled { .. })));
}

#[tokio::test]
async fn test_poll_cancelled_while_waiting() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(task_path("t10")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "t10", "status": "running"})))
        .mount(&server)
        .await;

    let policy = PollPolicy {
        running_interval: Duration::from_secs(30),
        max_interval: Duration::from_secs(30),
        deadline: Duration::from_secs(60),
        ..fast_policy(10)
    };
    let (trigger, handle) = shutdown::channel();
    let client = client_for(&server);

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.trigger();
    });
    let result = wait_for_video(&client, "t10", &policy, &handle, |_, _| {}).await;
    canceller.await.unwrap();

    match result {
        Err(err @ ArkError::Cancelled { .. }) => assert!(err.to_string().contains("--check t10")),
        other => panic!("Expected Cancelled, got {:?}", other),
    }
}
