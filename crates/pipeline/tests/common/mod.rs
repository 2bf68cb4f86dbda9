//! In-process fakes for the pipeline's collaborators.
//!
//! Each fake can snapshot the job's status at the moment it is called, so
//! tests can assert which stage the orchestrator was in without polling.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::{stream, StreamExt};
use vizgen_core::job::JobStatus;
use vizgen_core::types::JobId;
use vizgen_pipeline::config::ModelSettings;
use vizgen_pipeline::llm::{GenerationRequest, LanguageModel, LlmError};
use vizgen_pipeline::orchestrator::Orchestrator;
use vizgen_pipeline::registry::JobRegistry;
use vizgen_pipeline::render_upload::RenderUploadClient;
use vizgen_pipeline::renderer::{RenderError, VideoRenderer};
use vizgen_pipeline::storage::{StorageError, UploadSink, UploadTarget};
use vizgen_pipeline::ByteStream;

pub const VIDEO_CHUNKS: &[&[u8]] = &[b"\x00\x00\x00\x18ftyp", b"mp42", b"moov"];

pub fn settings(system: &str) -> ModelSettings {
    ModelSettings {
        model: "test-model".to_string(),
        system_instruction: system.to_string(),
        thinking_budget: Some(1024),
        temperature: None,
    }
}

// ---------------------------------------------------------------------------
// Language model
// ---------------------------------------------------------------------------

/// Replies with a fixed text, or fails, and records every request.
pub struct ScriptedModel {
    reply: Option<String>,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedModel {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(text.to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, request: GenerationRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request);
        match &self.reply {
            Some(text) => Ok(text.clone()),
            None => Err(LlmError::Api {
                status: 503,
                body: "model overloaded".to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

pub enum RenderScript {
    Stream,
    Reject,
    BreakMidStream,
}

pub struct FakeRenderer {
    script: RenderScript,
    registry: Arc<JobRegistry>,
    pub seen: Mutex<Vec<(JobId, String, Option<JobStatus>)>>,
}

impl FakeRenderer {
    pub fn new(script: RenderScript, registry: Arc<JobRegistry>) -> Arc<Self> {
        Arc::new(Self {
            script,
            registry,
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait::async_trait]
impl VideoRenderer for FakeRenderer {
    async fn render(&self, job_id: JobId, code: &str) -> Result<ByteStream, RenderError> {
        let status = self.registry.get(job_id).await.map(|j| j.status);
        self.seen
            .lock()
            .unwrap()
            .push((job_id, code.to_string(), status));

        let chunks = VIDEO_CHUNKS
            .iter()
            .map(|c| Ok(Bytes::from_static(*c)))
            .collect::<Vec<_>>();

        match self.script {
            RenderScript::Stream => Ok(stream::iter(chunks).boxed()),
            RenderScript::Reject => Err(RenderError::Api {
                status: 400,
                body: "Syntax Error: invalid syntax".to_string(),
            }),
            RenderScript::BreakMidStream => {
                let broken = chunks
                    .into_iter()
                    .take(1)
                    .chain(std::iter::once(Err(std::io::Error::other("connection reset"))));
                Ok(stream::iter(broken).boxed())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Upload sink
// ---------------------------------------------------------------------------

/// Drains the stream into memory and resolves to a fake CDN URL.
pub struct MemorySink {
    fail: bool,
    registry: Arc<JobRegistry>,
    pub uploads: Mutex<Vec<(UploadTarget, Vec<u8>, Option<JobStatus>)>>,
}

impl MemorySink {
    pub fn new(registry: Arc<JobRegistry>) -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            registry,
            uploads: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(registry: Arc<JobRegistry>) -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            registry,
            uploads: Mutex::new(Vec::new()),
        })
    }
}

pub fn cdn_url(target: &UploadTarget) -> String {
    format!("https://cdn.test/{}.mp4", target.object_path())
}

#[async_trait::async_trait]
impl UploadSink for MemorySink {
    async fn upload(
        &self,
        target: UploadTarget,
        mut body: ByteStream,
    ) -> Result<String, StorageError> {
        let job_id = target.public_id.parse::<JobId>().ok();
        let status = match job_id {
            Some(id) => self.registry.get(id).await.map(|j| j.status),
            None => None,
        };

        let mut data = Vec::new();
        let mut broken = false;
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => data.extend_from_slice(&bytes),
                Err(_) => {
                    broken = true;
                    break;
                }
            }
        }

        let url = cdn_url(&target);
        self.uploads.lock().unwrap().push((target, data, status));

        if self.fail || broken {
            return Err(StorageError::Api {
                status: 500,
                body: "upload interrupted".to_string(),
            });
        }
        Ok(url)
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

pub struct Harness {
    pub registry: Arc<JobRegistry>,
    pub coder: Arc<ScriptedModel>,
    pub renderer: Arc<FakeRenderer>,
    pub sink: Arc<MemorySink>,
    pub orchestrator: Arc<Orchestrator>,
}

pub fn harness(coder: Arc<ScriptedModel>, render: RenderScript, sink_fails: bool) -> Harness {
    let registry = Arc::new(JobRegistry::new());
    let renderer = FakeRenderer::new(render, Arc::clone(&registry));
    let sink = if sink_fails {
        MemorySink::failing(Arc::clone(&registry))
    } else {
        MemorySink::new(Arc::clone(&registry))
    };

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&registry),
        coder.clone(),
        settings("write manim"),
        RenderUploadClient::new(renderer.clone(), sink.clone(), "manim_videos".to_string()),
    ));

    Harness {
        registry,
        coder,
        renderer,
        sink,
        orchestrator,
    }
}
