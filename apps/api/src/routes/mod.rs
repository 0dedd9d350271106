pub mod health;

use axum::{extract::DefaultBodyLimit, routing::get, routing::post, Router};

use crate::candidates::handlers as candidates;
use crate::jobs::handlers as jobs;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // Résumé jobs
        .route(
            "/analyze_resumes",
            post(jobs::handle_analyze_resumes).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/status/:session_id", get(jobs::handle_status))
        .route("/result/:session_id", get(jobs::handle_result))
        // Stored candidates
        .route("/candidates", get(candidates::handle_list_candidates))
        .route("/candidates/*file_name", get(candidates::handle_get_candidate))
        .with_state(state)
}
