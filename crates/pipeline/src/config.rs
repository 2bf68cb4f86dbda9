//! Pipeline configuration loaded from the environment.
//!
//! Built once at startup and handed to the components that need it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::llm::DEFAULT_GEMINI_API_URL;
use crate::storage::{CloudinaryCredentials, DEFAULT_UPLOAD_FOLDER};

/// Model used for both planning and code synthesis unless overridden.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-04-17";

/// Default reasoning budget for both model calls.
pub const DEFAULT_THINKING_BUDGET: u32 = 24576;

/// Default sampling temperature for code synthesis.
pub const DEFAULT_CODING_TEMPERATURE: f32 = 0.7;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}'")]
    Invalid { var: &'static str, value: String },

    #[error("failed to read prompts file {path}: {source}")]
    PromptsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse prompts file {path}: {source}")]
    PromptsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The two fixed system instructions.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemPrompts {
    #[serde(rename = "analyzer_system_prompt")]
    pub planning: String,
    #[serde(rename = "coder_system_prompt")]
    pub coding: String,
}

impl SystemPrompts {
    /// Load from a JSON file with `analyzer_system_prompt` and
    /// `coder_system_prompt` keys.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::PromptsIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::PromptsParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Per-call model settings.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub model: String,
    pub system_instruction: String,
    pub thinking_budget: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub gemini_api_url: String,
    pub gemini_api_key: String,
    pub planning: ModelSettings,
    pub coding: ModelSettings,
    /// Base URL of the renderer.
    pub renderer_url: String,
    pub cloudinary: CloudinaryCredentials,
    pub upload_folder: String,
    /// Upper bound on one job's pipeline; `None` waits indefinitely.
    pub job_timeout: Option<Duration>,
}

impl PipelineConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                          | Default                            |
    /// |----------------------------------|------------------------------------|
    /// | `GOOGLE_GENERATIVE_AI_API_KEY`   | required                           |
    /// | `GEMINI_API_URL`                 | Gemini v1beta endpoint             |
    /// | `PLANNING_MODEL`                 | `gemini-2.5-flash-preview-04-17`   |
    /// | `CODING_MODEL`                   | `gemini-2.5-flash-preview-04-17`   |
    /// | `THINKING_BUDGET`                | `24576`                            |
    /// | `CODING_TEMPERATURE`             | `0.7`                              |
    /// | `MANIM_URL`                      | required                           |
    /// | `CLOUDINARY_CLOUD_NAME`          | required                           |
    /// | `CLOUDINARY_API_KEY`             | required                           |
    /// | `CLOUDINARY_API_SECRET`          | required                           |
    /// | `UPLOAD_FOLDER`                  | `manim_videos`                     |
    /// | `PROMPTS_PATH`                   | `config.json`                      |
    /// | `PIPELINE_TIMEOUT_SECS`          | `0` (no timeout)                   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let or_default = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let thinking_budget: u32 = parse_var(
            "THINKING_BUDGET",
            &or_default("THINKING_BUDGET", &DEFAULT_THINKING_BUDGET.to_string()),
        )?;
        let temperature: f32 = parse_var(
            "CODING_TEMPERATURE",
            &or_default("CODING_TEMPERATURE", &DEFAULT_CODING_TEMPERATURE.to_string()),
        )?;
        let timeout_secs: u64 = parse_var(
            "PIPELINE_TIMEOUT_SECS",
            &or_default("PIPELINE_TIMEOUT_SECS", "0"),
        )?;

        let prompts = SystemPrompts::load(Path::new(&or_default("PROMPTS_PATH", "config.json")))?;

        Ok(Self {
            gemini_api_url: or_default("GEMINI_API_URL", DEFAULT_GEMINI_API_URL),
            gemini_api_key: required("GOOGLE_GENERATIVE_AI_API_KEY")?,
            planning: ModelSettings {
                model: or_default("PLANNING_MODEL", DEFAULT_MODEL),
                system_instruction: prompts.planning,
                thinking_budget: Some(thinking_budget),
                temperature: None,
            },
            coding: ModelSettings {
                model: or_default("CODING_MODEL", DEFAULT_MODEL),
                system_instruction: prompts.coding,
                thinking_budget: Some(thinking_budget),
                temperature: Some(temperature),
            },
            renderer_url: required("MANIM_URL")?,
            cloudinary: CloudinaryCredentials {
                cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
                api_key: required("CLOUDINARY_API_KEY")?,
                api_secret: required("CLOUDINARY_API_SECRET")?,
            },
            upload_folder: or_default("UPLOAD_FOLDER", DEFAULT_UPLOAD_FOLDER),
            job_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        })
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_string(),
    })
}
