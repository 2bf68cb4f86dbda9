use axum::routing::get;
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/job/{job_id}/status", get(jobs::get_job_status))
}
