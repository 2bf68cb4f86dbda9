//! Handler for `GET /api/job/{job_id}/status`.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use vizgen_core::error::CoreError;
use vizgen_core::job::{Job, JobStatus};
use vizgen_core::types::JobId;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub video_url: Option<String>,
    pub error: Option<String>,
}

impl From<Job> for JobStatusResponse {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            video_url: job.video_url,
            error: job.error,
        }
    }
}

/// GET /api/job/{job_id}/status
///
/// A malformed id can never name a job, so it is reported the same way as
/// an unknown one.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<JobStatusResponse>> {
    let job_id: JobId = raw_id.parse().map_err(|_| {
        tracing::debug!(job_id = %raw_id, "Status requested for malformed job id");
        AppError::NotFound("job not found".to_string())
    })?;

    let job = state
        .registry
        .get(job_id)
        .await
        .ok_or(CoreError::JobNotFound(job_id))?;

    Ok(Json(job.into()))
}
