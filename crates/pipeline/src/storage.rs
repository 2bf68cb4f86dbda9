//! Upload sink seam and the Cloudinary streaming uploader.

use serde::Deserialize;
use sha2::{Digest, Sha256};
use vizgen_core::types::JobId;

use crate::ByteStream;

/// Default folder rendered videos are stored under.
pub const DEFAULT_UPLOAD_FOLDER: &str = "manim_videos";

/// Where an uploaded object lands in the storage provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    /// Object name, derived from the job id.
    pub public_id: String,
    /// Logical folder.
    pub folder: String,
    /// Provider resource type, always `video` for this pipeline.
    pub resource_type: &'static str,
}

impl UploadTarget {
    /// Target for a job's rendered video. The object name is the job id so
    /// the stored object can be correlated with the job out of band.
    pub fn for_job(job_id: JobId, folder: &str) -> Self {
        Self {
            public_id: job_id.to_string(),
            folder: folder.to_string(),
            resource_type: "video",
        }
    }

    /// `folder/public_id`.
    pub fn object_path(&self) -> String {
        format!("{}/{}", self.folder, self.public_id)
    }
}

/// Errors from the storage provider.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The HTTP request failed, including a failure of the source stream.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Upload rejected ({status}): {body}")]
    Api { status: u16, body: String },

    /// The provider accepted the upload but returned no URL.
    #[error("Upload response did not include a URL")]
    MissingUrl,
}

/// Streaming sink that stores a video and resolves to its public URL.
#[async_trait::async_trait]
pub trait UploadSink: Send + Sync {
    async fn upload(&self, target: UploadTarget, body: ByteStream) -> Result<String, StorageError>;
}

// ---------------------------------------------------------------------------
// Cloudinary
// ---------------------------------------------------------------------------

/// Default Cloudinary API base.
pub const DEFAULT_CLOUDINARY_API_URL: &str = "https://api.cloudinary.com/v1_1";

/// Account credentials for Cloudinary.
#[derive(Debug, Clone)]
pub struct CloudinaryCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Signed, streaming upload to Cloudinary.
///
/// Requests are signed with SHA-256 and say so via `signature_algorithm`.
/// Cloudinary verifies SHA-1 by default, so the account must have SHA-256
/// signatures enabled or every upload is rejected with 401.
pub struct CloudinaryUploader {
    client: reqwest::Client,
    api_url: String,
    credentials: CloudinaryCredentials,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

impl CloudinaryUploader {
    pub fn new(credentials: CloudinaryCredentials) -> Self {
        Self::with_client(
            reqwest::Client::new(),
            DEFAULT_CLOUDINARY_API_URL.to_string(),
            credentials,
        )
    }

    pub fn with_client(
        client: reqwest::Client,
        api_url: String,
        credentials: CloudinaryCredentials,
    ) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }
}

/// Cloudinary request signature: the signed params sorted by key, joined as
/// `k=v&k=v`, followed by the API secret, hashed with SHA-256 and hex encoded.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by_key(|(k, _)| *k);

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let hash = Sha256::digest(format!("{to_sign}{api_secret}").as_bytes());
    format!("{hash:x}")
}

#[async_trait::async_trait]
impl UploadSink for CloudinaryUploader {
    async fn upload(&self, target: UploadTarget, body: ByteStream) -> Result<String, StorageError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[
                ("folder", target.folder.as_str()),
                ("public_id", target.public_id.as_str()),
                ("timestamp", timestamp.as_str()),
            ],
            &self.credentials.api_secret,
        );

        let file = reqwest::multipart::Part::stream(reqwest::Body::wrap_stream(body))
            .file_name(format!("{}.mp4", target.public_id))
            .mime_str("video/mp4")?;

        let form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("api_key", self.credentials.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", target.folder.clone())
            .text("public_id", target.public_id.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = self
            .client
            .post(format!(
                "{}/{}/{}/upload",
                self.api_url, self.credentials.cloud_name, target.resource_type
            ))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(StorageError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<UploadResponse>()
            .await?
            .secure_url
            .filter(|url| !url.is_empty())
            .ok_or(StorageError::MissingUrl)
    }
}
