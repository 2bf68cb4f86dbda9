//! Language-model seam and the Gemini REST client.
//!
//! Both the planning model and the coding model are plain
//! request/response calls: a system instruction plus an ordered list of
//! turns in, free text out.

use serde::{Deserialize, Serialize};
use vizgen_core::chat::{ChatTurn, Role};

/// Default Gemini REST endpoint.
pub const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// One call to a language model.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Model identifier, e.g. `gemini-2.5-flash-preview-04-17`.
    pub model: String,
    pub system_instruction: String,
    pub turns: Vec<ChatTurn>,
    /// How many tokens the model may spend on internal reasoning.
    pub thinking_budget: Option<u32>,
    pub temperature: Option<f32>,
}

/// Errors from a language-model call.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Model API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The provider answered but produced no text.
    #[error("Model returned no text")]
    EmptyResponse,
}

/// A black-box text generator.
#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, LlmError>;
}

// ---------------------------------------------------------------------------
// Gemini
// ---------------------------------------------------------------------------

/// HTTP client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl GeminiClient {
    /// * `api_url` - Base URL, e.g. [`DEFAULT_GEMINI_API_URL`].
    pub fn new(api_url: String, api_key: String) -> Self {
        Self::with_client(reqwest::Client::new(), api_url, api_key)
    }

    /// Reuse an existing [`reqwest::Client`] for connection pooling.
    pub fn with_client(client: reqwest::Client, api_url: String, api_key: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    system_instruction: GeminiContent<'a>,
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPartOut<'a>>,
}

#[derive(Serialize)]
struct GeminiPartOut<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
    include_thoughts: bool,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

fn gemini_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

/// Concatenate the non-thought text parts of the first candidate.
fn first_candidate_text(response: GeminiResponse) -> Result<String, LlmError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|p| !p.thought)
                .filter_map(|p| p.text)
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        Err(LlmError::EmptyResponse)
    } else {
        Ok(text)
    }
}

#[async_trait::async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, LlmError> {
        let body = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPartOut {
                    text: &request.system_instruction,
                }],
            },
            contents: request
                .turns
                .iter()
                .map(|turn| GeminiContent {
                    role: Some(gemini_role(turn.role)),
                    parts: vec![GeminiPartOut {
                        text: &turn.content,
                    }],
                })
                .collect(),
            generation_config: GenerationConfig {
                response_mime_type: "text/plain",
                temperature: request.temperature,
                thinking_config: request.thinking_budget.map(|budget| ThinkingConfig {
                    thinking_budget: budget,
                    include_thoughts: false,
                }),
            },
        };

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.api_url, request.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        first_candidate_text(response.json::<GeminiResponse>().await?)
    }
}
