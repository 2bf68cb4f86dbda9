//! Job records and the pipeline status machine.
//!
//! Statuses only ever move forward:
//!
//! ```text
//! queued -> generating_code -> code_generated -> starting_generation -> uploading -> done
//! ```
//!
//! `error` is reachable from every non-terminal status. `done` and `error`
//! are terminal.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{JobId, Timestamp};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Pipeline stage of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    GeneratingCode,
    CodeGenerated,
    StartingGeneration,
    Uploading,
    Done,
    Error,
}

impl JobStatus {
    /// Wire name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::GeneratingCode => "generating_code",
            Self::CodeGenerated => "code_generated",
            Self::StartingGeneration => "starting_generation",
            Self::Uploading => "uploading",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// Returns the set of statuses `self` may transition to.
    pub fn valid_transitions(self) -> &'static [JobStatus] {
        match self {
            Self::Queued => &[Self::GeneratingCode, Self::Error],
            Self::GeneratingCode => &[Self::CodeGenerated, Self::Error],
            Self::CodeGenerated => &[Self::StartingGeneration, Self::Error],
            Self::StartingGeneration => &[Self::Uploading, Self::Error],
            Self::Uploading => &[Self::Done, Self::Error],
            Self::Done | Self::Error => &[],
        }
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        self.valid_transitions().contains(&next)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate that a status transition from `current` to `next` is allowed.
pub fn validate_transition(current: JobStatus, next: JobStatus) -> Result<(), CoreError> {
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(CoreError::Conflict(format!(
            "Cannot transition job from '{current}' to '{next}'. Allowed transitions: {:?}",
            current.valid_transitions()
        )))
    }
}

// ---------------------------------------------------------------------------
// Job record
// ---------------------------------------------------------------------------

/// One in-flight or completed generation request.
///
/// Invariants maintained by the mutators below:
/// - `video_url` is `Some` iff `status == Done`.
/// - `error` is `Some` iff `status == Error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub video_url: Option<String>,
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Job {
    /// A freshly created job: `queued`, no URL.
    pub fn new(id: JobId) -> Self {
        let now = chrono::Utc::now();
        Self {
            id,
            status: JobStatus::Queued,
            video_url: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance to a non-terminal status.
    ///
    /// `done` and `error` carry data and must go through [`Job::complete`]
    /// and [`Job::fail`].
    pub fn advance(&mut self, next: JobStatus) -> Result<(), CoreError> {
        if next.is_terminal() {
            return Err(CoreError::Conflict(format!(
                "'{next}' is terminal and must be set with its payload"
            )));
        }
        self.transition(next)
    }

    /// Attach the video URL and move to `done`.
    pub fn complete(&mut self, video_url: String) -> Result<(), CoreError> {
        if video_url.trim().is_empty() {
            return Err(CoreError::Validation("video URL must not be empty".into()));
        }
        if self.video_url.is_some() {
            return Err(CoreError::Conflict("video URL already set".into()));
        }
        self.transition(JobStatus::Done)?;
        self.video_url = Some(video_url);
        Ok(())
    }

    /// Move to `error`, recording why.
    pub fn fail(&mut self, reason: String) -> Result<(), CoreError> {
        self.transition(JobStatus::Error)?;
        self.error = Some(reason);
        Ok(())
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), CoreError> {
        validate_transition(self.status, next)?;
        self.status = next;
        self.updated_at = chrono::Utc::now();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
