pub mod generate;
pub mod health;
pub mod jobs;

use axum::Router;
use tower_http::timeout::TimeoutLayer;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// ```text
/// /generate                   planning step, may launch a job (POST)
/// /job/{job_id}/status        poll a job (GET, under `timeout`)
/// ```
pub fn api_routes(timeout: TimeoutLayer) -> Router<AppState> {
    Router::new()
        .merge(generate::router())
        .merge(jobs::router().layer(timeout))
}
