use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use storyboard_core::models::{
    AgentRun, CompleteRunInput, ProgressEntry, RecordProgressInput, RunWithProgress,
    StartRunInput,
};
use storyboard_core::StoreError;

use super::error::ApiResult;
use super::AppState;

/// 409 with the existing run's id when the story is already occupied.
pub async fn start_run(
    State(state): State<AppState>,
    Json(input): Json<StartRunInput>,
) -> ApiResult<(StatusCode, Json<AgentRun>)> {
    let run = state.db.start_run(input)?;
    Ok((StatusCode::CREATED, Json(run)))
}

pub async fn record_progress(
    State(state): State<AppState>,
    Json(input): Json<RecordProgressInput>,
) -> ApiResult<(StatusCode, Json<ProgressEntry>)> {
    let entry = state.db.record_progress(input)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn complete_run(
    State(state): State<AppState>,
    Json(input): Json<CompleteRunInput>,
) -> ApiResult<Json<AgentRun>> {
    Ok(Json(state.db.complete_run(input)?))
}

pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RunWithProgress>> {
    let run = state
        .db
        .get_run_with_progress(id)?
        .ok_or(StoreError::RunNotFound)?;
    Ok(Json(run))
}
