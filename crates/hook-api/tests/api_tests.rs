//! API integration tests.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use hook_api::{create_router, ApiConfig, AppState};
use hook_media::testing::FakeEngine;
use hook_pipeline::PipelineConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    dir: TempDir,
    state: AppState,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_config(|config| config).await
    }

    async fn with_config(configure: impl FnOnce(ApiConfig) -> ApiConfig) -> Self {
        let dir = TempDir::new().unwrap();
        let pipeline_config = PipelineConfig::rooted_at(dir.path()).with_selection_seed(7);

        std::fs::create_dir_all(&pipeline_config.input_dir).unwrap();
        FakeEngine::write_media(
            pipeline_config.horizontal_pool_dir.join("wide.mp4"),
            &FakeEngine::video(30.0, 1920, 1080),
        )
        .unwrap();
        FakeEngine::write_media(
            pipeline_config.vertical_pool_dir.join("tall.mp4"),
            &FakeEngine::video(20.0, 1080, 1920),
        )
        .unwrap();

        let config = configure(ApiConfig {
            presets_file: dir.path().join("presets.json"),
            ..ApiConfig::default()
        });
        let state = AppState::new(config, pipeline_config, Arc::new(FakeEngine::new()))
            .await
            .unwrap();

        Self { dir, state }
    }

    fn router(&self) -> Router {
        create_router(self.state.clone(), None)
    }

    fn input(&self, name: &str, info: &hook_media::MediaInfo) {
        FakeEngine::write_media(self.state.pipeline_config().input_dir.join(name), info).unwrap();
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

/// Test health endpoints.
#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new().await;
    for uri in ["/health", "/healthz"] {
        let (status, body) = app.send("GET", uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }
}

#[tokio::test]
async fn test_ready_checks_directories() {
    let app = TestApp::new().await;
    let (status, body) = app.send("GET", "/ready", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["engine"]["status"], "ok");
    assert!(app.dir.path().join("output").exists());
}

#[tokio::test]
async fn test_metrics_disabled() {
    let app = TestApp::new().await;
    let (status, _) = app.send("GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_process_and_status() {
    let app = TestApp::new().await;
    app.input("intro_hook.mp4", &FakeEngine::video(4.0, 1280, 720));

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/hook/process",
            Some(json!({
                "job_id": "job-1",
                "hook_path": "intro_hook.mp4",
                "output_name": "intro",
                "subtitles": {
                    "format": "inline",
                    "entries": [{"start": 0.0, "end": 2.0, "text": "Wait for it"}]
                }
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "succeeded");
    assert!(body["output_path"].as_str().unwrap().ends_with("output/intro.mp4"));

    let (status, stored) = app.send("GET", "/api/v1/hook/status/job-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored, body);
}

#[tokio::test]
async fn test_process_failure_reports_kind_and_stage() {
    let app = TestApp::new().await;
    app.input("late_hook.mp4", &FakeEngine::video(4.0, 1280, 720));

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/hook/process",
            Some(json!({
                "job_id": "late",
                "hook_path": "late_hook.mp4",
                "subtitles": {
                    "format": "inline",
                    "entries": [
                        {"start": 0.0, "end": 2.0, "text": "ok"},
                        {"start": 29.0, "end": 31.0, "text": "too late"}
                    ]
                }
            })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "invalid_subtitle_timing");
    assert_eq!(body["stage"], "subtitle_compiling");
    assert_eq!(body["entry_index"], 1);

    // Failures are kept in history too
    let (status, stored) = app.send("GET", "/api/v1/hook/status/late", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["status"], "failed");
}

#[tokio::test]
async fn test_status_history_is_bounded() {
    let app = TestApp::with_config(|config| ApiConfig {
        history_max_entries: 1,
        ..config
    })
    .await;
    app.input("h_hook.mp4", &FakeEngine::video(3.0, 1280, 720));

    for (job_id, name) in [("first", "one"), ("second", "two")] {
        let (status, _) = app
            .send(
                "POST",
                "/api/v1/hook/process",
                Some(json!({"job_id": job_id, "hook_path": "h_hook.mp4", "output_name": name})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = app.send("GET", "/api/v1/hook/status/first", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.send("GET", "/api/v1/hook/status/second", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_status() {
    let app = TestApp::new().await;
    let (status, body) = app.send("GET", "/api/v1/hook/status/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_invalid_request_rejected() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send(
            "POST",
            "/api/v1/hook/process",
            Some(json!({ "hook_path": "a_hook.mp4", "output_name": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn test_vertical_batch() {
    let app = TestApp::new().await;
    app.input("a_hook.mp4", &FakeEngine::video(3.0, 1280, 720));
    app.input("b_hook.mp3", &FakeEngine::audio(25.0));

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/hook/process_batch_vertical",
            Some(json!({
                "requests": [
                    {"hook_path": "a_hook.mp4", "aspect_mode": "horizontal"},
                    {"hook_path": "b_hook.mp3"}
                ],
                "max_concurrency": 2
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["succeeded"], 1);
    assert_eq!(body["failed"], 1);
    // The 25 s hook does not fit the 20 s vertical background
    assert_eq!(body["results"][1]["error_detail"]["kind"], "audio_duration_mismatch");
}

#[tokio::test]
async fn test_presets_crud_and_use() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/hook/presets",
            Some(json!({"name": "big", "style": {"font_size": 72, "primary_color": "#FFFF00"}})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let (status, body) = app.send("GET", "/api/v1/hook/presets", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["big"]["font_size"], 72);
    assert!(app.dir.path().join("presets.json").exists());

    app.input("p_hook.mp4", &FakeEngine::video(3.0, 1280, 720));
    let (status, _) = app
        .send(
            "POST",
            "/api/v1/hook/process",
            Some(json!({"hook_path": "p_hook.mp4", "preset_name": "big"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/hook/process",
            Some(json!({"hook_path": "p_hook.mp4", "preset_name": "missing"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");

    let (status, _) = app.send("DELETE", "/api/v1/hook/presets/big", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.send("DELETE", "/api/v1/hook/presets/big", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_batch_folder() {
    let app = TestApp::new().await;
    let folder = app.state.pipeline_config().input_dir.join("batch");
    FakeEngine::write_media(folder.join("one_hook.mp4"), &FakeEngine::video(3.0, 1280, 720)).unwrap();
    FakeEngine::write_media(folder.join("one_audio.mp3"), &FakeEngine::audio(90.0)).unwrap();
    std::fs::write(
        folder.join("one.srt"),
        "1\n00:00:00,000 --> 00:00:02,000\nHello\n",
    )
    .unwrap();
    FakeEngine::write_media(folder.join("two_hook.mp3"), &FakeEngine::audio(5.0)).unwrap();
    std::fs::write(folder.join("orphan.srt"), "").unwrap();

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/hook/batch-folder",
            Some(json!({"input_folder": "batch"})),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["total"], 2);
    assert_eq!(body["succeeded"], 2, "{}", body);
    assert_eq!(body["skipped"][0]["name"], "orphan");
    assert!(app.dir.path().join("output/one.mp4").exists());
    assert!(app.dir.path().join("output/two.mp4").exists());

    let (status, _) = app
        .send(
            "POST",
            "/api/v1/hook/batch-folder",
            Some(json!({"input_folder": "does-not-exist"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_batch_with_unbounded_concurrency() {
    let app = TestApp::new().await;
    app.input("u_hook.mp4", &FakeEngine::video(3.0, 1280, 720));

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/hook/batch",
            Some(json!({
                "requests": [
                    {"hook_path": "u_hook.mp4", "output_name": "u1"},
                    {"hook_path": "u_hook.mp4", "output_name": "u1"}
                ],
                "max_concurrency": usize::MAX
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["total"], 2);
    assert_eq!(body["succeeded"], 1);
    assert_eq!(body["results"][1]["error_detail"]["kind"], "workspace_io_error");
}

#[tokio::test]
async fn test_request_id_echoed() {
    let app = TestApp::new().await;
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("X-Request-ID", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["X-Request-ID"], "abc-123");
}
