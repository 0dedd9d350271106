//! Axum route handlers for reading stored candidates.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::candidates::models::{rank_by_score, CandidateRecord};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CandidateFilter {
    pub session_id: Option<Uuid>,
}

/// GET /candidates
///
/// Stored candidates ordered by score, with `rank` set to the 1-based
/// position. `?session_id=` narrows the list to one job's candidates.
pub async fn handle_list_candidates(
    State(state): State<AppState>,
    Query(filter): Query<CandidateFilter>,
) -> Result<Json<Vec<CandidateRecord>>, AppError> {
    let mut records = state.store.find_all().await?;
    if let Some(session_id) = filter.session_id {
        records.retain(|r| r.session_id == session_id);
    }
    Ok(Json(rank_by_score(records)))
}

/// GET /candidates/*file_name
///
/// `file_name` is the archive member path, so nested members keep their
/// directories (`a/cv.pdf`).
pub async fn handle_get_candidate(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Json<CandidateRecord>, AppError> {
    state
        .store
        .find_by_filename(&file_name)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Candidate {file_name} not found")))
}
