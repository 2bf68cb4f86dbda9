//! REST client for the external video renderer.
//!
//! The renderer takes generated scene code and answers with the rendered
//! video as a streamed response body.

use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use vizgen_core::types::JobId;

use crate::ByteStream;

/// Errors from the renderer.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The renderer returned a non-2xx status code.
    #[error("Renderer error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

/// Turns generated code into a video stream.
#[async_trait::async_trait]
pub trait VideoRenderer: Send + Sync {
    /// Submit `code` for rendering.
    ///
    /// Resolves once the renderer has accepted the request and the video
    /// body has started streaming; chunk errors surface through the stream.
    async fn render(&self, job_id: JobId, code: &str) -> Result<ByteStream, RenderError>;
}

#[derive(Debug, Serialize)]
struct RenderRequest<'a> {
    manim_code: &'a str,
    job_id: String,
}

/// Body of the renderer's `GET /health`.
#[derive(Debug, Deserialize)]
pub struct RendererHealth {
    pub status: String,
}

/// HTTP client for a single renderer instance.
pub struct RendererApi {
    client: reqwest::Client,
    api_url: String,
}

impl RendererApi {
    /// * `api_url` - Base HTTP URL, e.g. `http://localhost:8000`.
    pub fn new(api_url: String) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Query `GET /health`.
    pub async fn health(&self) -> Result<RendererHealth, RenderError> {
        let response = self
            .client
            .get(format!("{}/health", self.api_url))
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.json().await?)
    }

    /// Return the response unchanged on success, or a
    /// [`RenderError::Api`] with the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, RenderError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(RenderError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl VideoRenderer for RendererApi {
    async fn render(&self, job_id: JobId, code: &str) -> Result<ByteStream, RenderError> {
        let response = self
            .client
            .post(format!("{}/generate-video", self.api_url))
            .json(&RenderRequest {
                manim_code: code,
                job_id: job_id.to_string(),
            })
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;

        Ok(Box::pin(response.bytes_stream().map_err(std::io::Error::other)))
    }
}
