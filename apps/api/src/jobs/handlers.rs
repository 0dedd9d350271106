//! Axum route handlers for submitting résumé jobs and polling them.

use anyhow::Context;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::runner::Job;
use crate::jobs::session::{BatchProgress, JobResult, JobStatus};
use crate::jobs::workspace::{JobWorkspace, WorkspaceError};
use crate::state::AppState;

const ARCHIVE_FIELD: &str = "resumes_zip";
const QUERY_FIELD: &str = "query";

#[derive(Debug, Serialize)]
pub struct StartJobResponse {
    pub status: &'static str,
    pub session_id: Uuid,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: JobStatus,
    #[serde(flatten)]
    pub progress: Option<BatchProgress>,
}

/// POST /analyze_resumes
///
/// Unpacks the uploaded zip, registers a session, and hands the work to the
/// job runner. Answers 202 without waiting for any of the pipeline.
pub async fn handle_analyze_resumes(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StartJobResponse>), AppError> {
    let swept = state.sessions.sweep(Utc::now(), state.config.session_expiry);
    if swept > 0 {
        debug!(swept, "Removed expired sessions");
    }

    let mut archive: Option<Bytes> = None;
    let mut query: Option<String> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(ARCHIVE_FIELD) => {
                archive = Some(field.bytes().await.map_err(|e| {
                    AppError::Validation(format!("Could not read {ARCHIVE_FIELD}: {e}"))
                })?);
            }
            Some(QUERY_FIELD) => {
                query = Some(field.text().await.map_err(|e| {
                    AppError::Validation(format!("Could not read {QUERY_FIELD}: {e}"))
                })?);
            }
            _ => {}
        }
    }

    let (Some(archive), Some(query)) = (archive, query) else {
        return Err(AppError::Validation(
            "Missing resumes_zip or query parameter".to_string(),
        ));
    };
    if query.trim().is_empty() {
        return Err(AppError::Validation("query cannot be empty".to_string()));
    }

    let scratch_dir = state.config.scratch_dir.clone();
    let limit = state.config.max_unpacked_bytes;
    let unpacked =
        tokio::task::spawn_blocking(move || JobWorkspace::unpack(&archive, &scratch_dir, limit))
            .await
            .context("archive extraction task failed")?;
    let workspace = match unpacked {
        Ok(workspace) => workspace,
        Err(e @ WorkspaceError::TooLarge { .. }) => {
            return Err(AppError::Validation(format!("resumes_zip rejected: {e}")))
        }
        Err(e) => return Err(anyhow::Error::from(e).context("failed to unpack resumes_zip").into()),
    };

    let session_id = state.sessions.create(&query);
    info!(
        %session_id,
        files = workspace.files().len(),
        workspace = %workspace.path().display(),
        "Session started"
    );

    state.runner.submit(Job {
        session_id,
        workspace,
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(StartJobResponse {
            status: "processing",
            session_id,
            message: "Resume processing started.",
        }),
    ))
}

/// GET /status/:session_id
pub async fn handle_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    let session = Uuid::parse_str(&session_id)
        .ok()
        .and_then(|id| state.sessions.get(&id))
        .ok_or(AppError::SessionNotFound)?;

    Ok(Json(StatusResponse {
        status: session.status,
        progress: session.progress,
    }))
}

/// GET /result/:session_id
///
/// Only a session in status 3 has a result to hand out; failed, running and
/// unknown sessions all answer "not ready".
pub async fn handle_result(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<JobResult>, AppError> {
    let session = Uuid::parse_str(&session_id)
        .ok()
        .and_then(|id| state.sessions.get(&id))
        .ok_or(AppError::ResultNotReady)?;

    match (session.status, session.result) {
        (JobStatus::Completed, Some(result)) => Ok(Json(result)),
        _ => Err(AppError::ResultNotReady),
    }
}
