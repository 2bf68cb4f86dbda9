//! Intake handler.
//!
//! Sends the conversation to the planning model and, when the answer
//! contains a fenced breakdown, creates a job and launches its pipeline
//! without waiting for it.

use std::sync::Arc;

use vizgen_core::chat::{latest_user_request, ChatTurn};
use vizgen_core::error::CoreError;
use vizgen_core::extract::extract_breakdown;
use vizgen_core::types::JobId;

use crate::config::ModelSettings;
use crate::llm::{GenerationRequest, LanguageModel, LlmError};
use crate::orchestrator::{JobRequest, Orchestrator};
use crate::registry::JobRegistry;

/// Result of one intake call.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeOutcome {
    /// Raw planning-model text, returned whether or not a job started.
    pub llm_response: String,
    /// Set only when a breakdown was found and a job launched.
    pub job_id: Option<JobId>,
}

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error("planning model call failed: {0}")]
    Planning(#[from] LlmError),
}

pub struct IntakeHandler {
    planner: Arc<dyn LanguageModel>,
    planning: ModelSettings,
    registry: Arc<JobRegistry>,
    orchestrator: Arc<Orchestrator>,
}

impl IntakeHandler {
    pub fn new(
        planner: Arc<dyn LanguageModel>,
        planning: ModelSettings,
        registry: Arc<JobRegistry>,
        orchestrator: Arc<Orchestrator>,
    ) -> Self {
        Self {
            planner,
            planning,
            registry,
            orchestrator,
        }
    }

    pub async fn handle(&self, turns: Vec<ChatTurn>) -> Result<IntakeOutcome, IntakeError> {
        let user_request = latest_user_request(&turns)?.to_string();

        let llm_response = self
            .planner
            .generate(GenerationRequest {
                model: self.planning.model.clone(),
                system_instruction: self.planning.system_instruction.clone(),
                turns,
                thinking_budget: self.planning.thinking_budget,
                temperature: self.planning.temperature,
            })
            .await?;

        let Some(breakdown) = extract_breakdown(&llm_response) else {
            tracing::debug!("Planning response has no breakdown; no job created");
            return Ok(IntakeOutcome {
                llm_response,
                job_id: None,
            });
        };

        let job_id = self.registry.create().await;
        tracing::info!(job_id = %job_id, breakdown_len = breakdown.len(), "Job accepted");

        // Detached: the caller gets the id now and polls for progress.
        drop(self.orchestrator.launch(JobRequest {
            job_id,
            user_request,
            breakdown,
        }));

        Ok(IntakeOutcome {
            llm_response,
            job_id: Some(job_id),
        })
    }
}
