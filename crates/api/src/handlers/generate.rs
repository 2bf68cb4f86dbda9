//! Handler for `POST /api/generate`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use vizgen_core::chat::ChatTurn;
use vizgen_core::types::JobId;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub messages: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub llm_response: String,
    /// `null` when the planning answer held no breakdown.
    pub job_id: Option<JobId>,
}

/// POST /api/generate
///
/// Runs the planning step and returns its text. When the text carries a
/// fenced breakdown a job is launched in the background and its id is
/// returned; the caller polls the status endpoint from there.
pub async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> AppResult<Json<GenerateResponse>> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let outcome = state.intake.handle(request.messages).await?;

    match outcome.job_id {
        Some(job_id) => tracing::info!(job_id = %job_id, "Generation job launched"),
        None => tracing::debug!("Planning answered without a breakdown"),
    }

    Ok(Json(GenerateResponse {
        llm_response: outcome.llm_response,
        job_id: outcome.job_id,
    }))
}
