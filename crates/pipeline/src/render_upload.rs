//! Render-and-upload client.
//!
//! Pipes the renderer's streamed response body straight into the upload
//! sink; the video is never buffered whole. The two halves are exposed
//! separately so the orchestrator can record the moment streaming begins.
//! A failed upload leaves whatever the provider kept; no cleanup is done.

use std::sync::Arc;

use vizgen_core::types::JobId;

use crate::renderer::{RenderError, VideoRenderer};
use crate::storage::{StorageError, UploadSink, UploadTarget};
use crate::ByteStream;

pub struct RenderUploadClient {
    renderer: Arc<dyn VideoRenderer>,
    sink: Arc<dyn UploadSink>,
    folder: String,
}

impl RenderUploadClient {
    pub fn new(
        renderer: Arc<dyn VideoRenderer>,
        sink: Arc<dyn UploadSink>,
        folder: String,
    ) -> Self {
        Self {
            renderer,
            sink,
            folder,
        }
    }

    /// Ask the renderer for the video; resolves once it starts streaming.
    pub async fn start_render(
        &self,
        job_id: JobId,
        code: &str,
    ) -> Result<ByteStream, RenderError> {
        tracing::info!(job_id = %job_id, code_len = code.len(), "Requesting render");
        self.renderer.render(job_id, code).await
    }

    /// Stream `video` into the sink under the job's object name and return
    /// the resolved public URL.
    pub async fn upload(&self, job_id: JobId, video: ByteStream) -> Result<String, StorageError> {
        let target = UploadTarget::for_job(job_id, &self.folder);
        tracing::info!(job_id = %job_id, object = %target.object_path(), "Uploading video");
        self.sink.upload(target, video).await
    }
}
