use std::sync::Arc;

use vizgen_pipeline::intake::IntakeHandler;
use vizgen_pipeline::registry::JobRegistry;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Job records read by the status endpoint.
    pub registry: Arc<JobRegistry>,
    /// Planning step plus job launch for `/api/generate`.
    pub intake: Arc<IntakeHandler>,
}
