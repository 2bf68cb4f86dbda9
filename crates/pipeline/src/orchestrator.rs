//! Pipeline orchestrator.
//!
//! Drives one job through its stages as a detached Tokio task:
//!
//! ```text
//! queued -> generating_code -> code_generated -> starting_generation -> uploading -> done
//! ```
//!
//! Every failure after job creation is caught in [`Orchestrator::run`],
//! logged with the job id and the stage it happened in, and recorded as the
//! job's `error` status. Nothing propagates to whoever launched the task.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use vizgen_core::chat::ChatTurn;
use vizgen_core::extract::extract_code;
use vizgen_core::job::JobStatus;
use vizgen_core::types::JobId;

use crate::config::ModelSettings;
use crate::error::PipelineError;
use crate::llm::{GenerationRequest, LanguageModel};
use crate::registry::JobRegistry;
use crate::render_upload::RenderUploadClient;

/// Input for one job's pipeline.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub job_id: JobId,
    /// The user's latest chat message.
    pub user_request: String,
    /// Plan extracted from the planning model's response.
    pub breakdown: String,
}

impl JobRequest {
    /// Prompt handed to the coding model.
    pub fn coding_prompt(&self) -> String {
        format!(
            "User request: {}\n\nBreakdown:\n{}",
            self.user_request, self.breakdown
        )
    }
}

/// How a job's pipeline ended.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Done {
        video_url: String,
    },
    Failed {
        /// Status the job was in when the failure happened.
        stage: JobStatus,
        message: String,
    },
}

pub struct Orchestrator {
    registry: Arc<JobRegistry>,
    coder: Arc<dyn LanguageModel>,
    coding: ModelSettings,
    render_upload: RenderUploadClient,
    job_timeout: Option<Duration>,
    tracker: TaskTracker,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<JobRegistry>,
        coder: Arc<dyn LanguageModel>,
        coding: ModelSettings,
        render_upload: RenderUploadClient,
    ) -> Self {
        Self {
            registry,
            coder,
            coding,
            render_upload,
            job_timeout: None,
            tracker: TaskTracker::new(),
        }
    }

    /// Bound every job's pipeline by `timeout`. Expiry ends the job in `error`.
    pub fn with_job_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.job_timeout = timeout;
        self
    }

    /// Spawn the pipeline for `request` as a detached task.
    ///
    /// The handle may be dropped; the job still runs to completion.
    pub fn launch(self: &Arc<Self>, request: JobRequest) -> JoinHandle<JobOutcome> {
        let this = Arc::clone(self);
        self.tracker.spawn(async move { this.run(request).await })
    }

    /// Number of pipelines still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for running pipelines, giving up after `grace`.
    /// Returns `true` if every pipeline finished.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.tracker.close();
        tokio::time::timeout(grace, self.tracker.wait()).await.is_ok()
    }

    /// Run the pipeline for `request` to a terminal status.
    pub async fn run(&self, request: JobRequest) -> JobOutcome {
        let job_id = request.job_id;
        tracing::info!(job_id = %job_id, "Generation flow started");

        let result = match self.job_timeout {
            Some(limit) => tokio::time::timeout(limit, self.drive(&request))
                .await
                .unwrap_or(Err(PipelineError::TimedOut(limit))),
            None => self.drive(&request).await,
        };

        match result {
            Ok(video_url) => {
                tracing::info!(
                    job_id = %job_id,
                    video_url = %video_url,
                    "Generation flow finished"
                );
                JobOutcome::Done { video_url }
            }
            Err(err) => self.record_failure(job_id, err).await,
        }
    }

    async fn drive(&self, request: &JobRequest) -> Result<String, PipelineError> {
        let job_id = request.job_id;

        self.registry
            .update_status(job_id, JobStatus::GeneratingCode)
            .await?;

        let response = self
            .coder
            .generate(GenerationRequest {
                model: self.coding.model.clone(),
                system_instruction: self.coding.system_instruction.clone(),
                turns: vec![ChatTurn::user(request.coding_prompt())],
                thinking_budget: self.coding.thinking_budget,
                temperature: self.coding.temperature,
            })
            .await
            .map_err(PipelineError::CodeGeneration)?;

        let code = extract_code(&response).ok_or(PipelineError::CodeNotFound)?;
        self.registry
            .update_status(job_id, JobStatus::CodeGenerated)
            .await?;

        self.registry
            .update_status(job_id, JobStatus::StartingGeneration)
            .await?;
        let video = self.render_upload.start_render(job_id, &code).await?;

        self.registry
            .update_status(job_id, JobStatus::Uploading)
            .await?;
        let video_url = self.render_upload.upload(job_id, video).await?;

        self.registry
            .set_video_url(job_id, video_url.clone())
            .await?;
        Ok(video_url)
    }

    async fn record_failure(&self, job_id: JobId, err: PipelineError) -> JobOutcome {
        let stage = self
            .registry
            .get(job_id)
            .await
            .map_or(JobStatus::Queued, |job| job.status);
        let message = format!("failed during {stage}: {err}");

        tracing::error!(job_id = %job_id, stage = %stage, error = %err, "Generation flow failed");

        if let Err(e) = self.registry.fail(job_id, message.clone()).await {
            tracing::error!(job_id = %job_id, error = %e, "Could not mark job as failed");
        }

        JobOutcome::Failed { stage, message }
    }
}
