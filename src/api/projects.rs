use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use storyboard_core::models::{CreateProjectInput, DomainEvent, Project};
use storyboard_core::StoreError;

use super::error::ApiResult;
use super::AppState;

pub async fn create_project(
    State(state): State<AppState>,
    Json(input): Json<CreateProjectInput>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let project = state.db.create_project(input)?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
    let project = state
        .db
        .get_project(id)?
        .ok_or(StoreError::ProjectNotFound)?;
    Ok(Json(project))
}

pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.db.list_projects()?))
}

/// The project's append-only domain event log, oldest first.
pub async fn list_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<DomainEvent>>> {
    if state.db.get_project(id)?.is_none() {
        return Err(StoreError::ProjectNotFound.into());
    }
    Ok(Json(state.db.events_by_project(id)?))
}
