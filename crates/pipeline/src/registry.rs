//! Concurrent store of job records.
//!
//! The registry exclusively owns every [`Job`]. Each job has exactly one
//! writer (its orchestrator task); status polls read concurrently and get
//! a cloned snapshot taken under the same lock as the writes.

use std::collections::HashMap;

use tokio::sync::RwLock;
use vizgen_core::error::CoreError;
use vizgen_core::job::{Job, JobStatus};
use vizgen_core::types::JobId;

/// Process-lifetime job store. Records are never evicted.
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Allocate a fresh id and insert a `queued` record with no URL.
    pub async fn create(&self) -> JobId {
        let mut jobs = self.jobs.write().await;
        let mut id = JobId::new();
        while jobs.contains_key(&id) {
            id = JobId::new();
        }
        jobs.insert(id, Job::new(id));
        tracing::debug!(job_id = %id, "Job created");
        id
    }

    /// Snapshot of a job, or `None` if the id is unknown.
    pub async fn get(&self, id: JobId) -> Option<Job> {
        self.jobs.read().await.get(&id).cloned()
    }

    /// Move a job to a non-terminal status.
    ///
    /// Unknown ids are a no-op. Illegal transitions are rejected with
    /// [`CoreError::Conflict`] and leave the record untouched.
    pub async fn update_status(&self, id: JobId, status: JobStatus) -> Result<(), CoreError> {
        if self.with_job(id, |job| job.advance(status)).await? {
            tracing::info!(job_id = %id, status = %status, "Job status updated");
        }
        Ok(())
    }

    /// Attach the final video URL, moving the job to `done`.
    ///
    /// Status and URL change under one write lock, so no reader ever sees
    /// `done` without a URL.
    pub async fn set_video_url(&self, id: JobId, url: String) -> Result<(), CoreError> {
        if self.with_job(id, |job| job.complete(url)).await? {
            tracing::info!(job_id = %id, "Job done");
        }
        Ok(())
    }

    /// Move a job to `error`, recording the failure reason.
    pub async fn fail(&self, id: JobId, reason: String) -> Result<(), CoreError> {
        self.with_job(id, |job| job.fail(reason)).await.map(|_| ())
    }

    /// Number of tracked jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Apply `f` to the record under the write lock. Returns `Ok(false)`
    /// when the id is unknown.
    async fn with_job<F>(&self, id: JobId, f: F) -> Result<bool, CoreError>
    where
        F: FnOnce(&mut Job) -> Result<(), CoreError>,
    {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&id) else {
            tracing::warn!(job_id = %id, "Update for unknown job ignored");
            return Ok(false);
        };
        f(job).inspect_err(|e| {
            tracing::error!(job_id = %id, current = %job.status, error = %e, "Rejected job update");
        })?;
        Ok(true)
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}
