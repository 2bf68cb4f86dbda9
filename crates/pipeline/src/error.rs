use std::time::Duration;

use vizgen_core::error::CoreError;

use crate::llm::LlmError;
use crate::renderer::RenderError;
use crate::storage::StorageError;

/// A failure inside one job's pipeline.
///
/// Never returned to an HTTP caller: the orchestrator catches it, logs it
/// and records it on the job as the `error` status.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("code generation failed: {0}")]
    CodeGeneration(#[source] LlmError),

    #[error("code model response contained no code block")]
    CodeNotFound,

    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    #[error("upload failed: {0}")]
    Upload(#[from] StorageError),

    #[error("job record rejected update: {0}")]
    Registry(#[from] CoreError),

    #[error("pipeline exceeded {0:?}")]
    TimedOut(Duration),
}
