//! Job orchestration pipeline.
//!
//! Carries a visualization request from intake through plan extraction,
//! code synthesis, external rendering and upload, tracking every job in a
//! shared [`registry::JobRegistry`] that status polls read from.
//!
//! The language models, the renderer and the storage provider sit behind
//! the [`llm::LanguageModel`], [`renderer::VideoRenderer`] and
//! [`storage::UploadSink`] traits.

pub mod config;
pub mod error;
pub mod intake;
pub mod llm;
pub mod orchestrator;
pub mod registry;
pub mod render_upload;
pub mod renderer;
pub mod storage;

/// Streamed binary payload handed from the renderer to the upload sink.
pub type ByteStream =
    futures::stream::BoxStream<'static, Result<bytes::Bytes, std::io::Error>>;
