#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderValue, Method, Request};
use axum::response::Response;
use axum::Router;
use bytes::Bytes;
use futures::{stream, StreamExt};
use http_body_util::BodyExt;
use tower::ServiceExt;
use vizgen_api::config::ServerConfig;
use vizgen_api::router::build_app_router;
use vizgen_api::state::AppState;
use vizgen_core::types::JobId;
use vizgen_pipeline::config::ModelSettings;
use vizgen_pipeline::intake::IntakeHandler;
use vizgen_pipeline::llm::{GenerationRequest, LanguageModel, LlmError};
use vizgen_pipeline::orchestrator::Orchestrator;
use vizgen_pipeline::registry::JobRegistry;
use vizgen_pipeline::render_upload::RenderUploadClient;
use vizgen_pipeline::renderer::{RenderError, VideoRenderer};
use vizgen_pipeline::storage::{StorageError, UploadSink, UploadTarget};
use vizgen_pipeline::ByteStream;

pub const PLAN_REPLY: &str = "Sure, here:\n```\nstep 1\nstep 2\n```";
pub const CODE_REPLY: &str = "```python\nfrom manim import *\n```";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![HeaderValue::from_static("http://localhost:5173")],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
    }
}

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Answers every request with the same text, or fails.
pub struct FixedModel(Option<&'static str>);

#[async_trait::async_trait]
impl LanguageModel for FixedModel {
    async fn generate(&self, _request: GenerationRequest) -> Result<String, LlmError> {
        self.0.map(str::to_string).ok_or(LlmError::Api {
            status: 500,
            body: "internal model error".to_string(),
        })
    }
}

/// Answers with `reply` after `delay`.
pub struct SlowModel {
    pub delay: Duration,
    pub reply: &'static str,
}

#[async_trait::async_trait]
impl LanguageModel for SlowModel {
    async fn generate(&self, _request: GenerationRequest) -> Result<String, LlmError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.reply.to_string())
    }
}

pub struct StreamingRenderer;

#[async_trait::async_trait]
impl VideoRenderer for StreamingRenderer {
    async fn render(&self, _job_id: JobId, _code: &str) -> Result<ByteStream, RenderError> {
        Ok(stream::iter([
            Ok(Bytes::from_static(b"ftyp")),
            Ok(Bytes::from_static(b"moov")),
        ])
        .boxed())
    }
}

pub struct DrainSink;

#[async_trait::async_trait]
impl UploadSink for DrainSink {
    async fn upload(
        &self,
        target: UploadTarget,
        mut body: ByteStream,
    ) -> Result<String, StorageError> {
        while body.next().await.is_some() {}
        Ok(format!("https://cdn.test/{}.mp4", target.object_path()))
    }
}

// ---------------------------------------------------------------------------
// App assembly
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub registry: Arc<JobRegistry>,
    pub orchestrator: Arc<Orchestrator>,
}

fn settings(system: &str) -> ModelSettings {
    ModelSettings {
        model: "test-model".to_string(),
        system_instruction: system.to_string(),
        thinking_budget: None,
        temperature: None,
    }
}

/// Build the full application with the production middleware stack and
/// in-process collaborators. `planner_reply` of `None` makes planning fail.
pub fn build_test_app(planner_reply: Option<&'static str>) -> TestApp {
    build_test_app_with_planner(Arc::new(FixedModel(planner_reply)))
}

pub fn build_test_app_with_planner(planner: Arc<dyn LanguageModel>) -> TestApp {
    let config = test_config();
    let registry = Arc::new(JobRegistry::new());

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&registry),
        Arc::new(FixedModel(Some(CODE_REPLY))),
        settings("code"),
        RenderUploadClient::new(
            Arc::new(StreamingRenderer),
            Arc::new(DrainSink),
            "manim_videos".to_string(),
        ),
    ));
    let intake = Arc::new(IntakeHandler::new(
        planner,
        settings("plan"),
        Arc::clone(&registry),
        Arc::clone(&orchestrator),
    ));

    let state = AppState {
        config: Arc::new(config.clone()),
        registry: Arc::clone(&registry),
        intake,
    };

    TestApp {
        router: build_app_router(state, &config),
        registry,
        orchestrator,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    post_raw(app, uri, body.to_string()).await
}

pub async fn post_raw(app: Router, uri: &str, body: String) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
