use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use storyboard_core::models::{CreateMemberInput, TeamMember};

use super::error::ApiResult;
use super::AppState;

pub async fn list_members(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<TeamMember>>> {
    Ok(Json(state.db.members_by_project(project_id)?))
}

pub async fn create_member(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(input): Json<CreateMemberInput>,
) -> ApiResult<(StatusCode, Json<TeamMember>)> {
    let member = state.db.create_member(project_id, input)?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// Assignee snapshots on stories are copies and survive this.
pub async fn delete_member(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.db.delete_member(id)?;
    Ok(StatusCode::NO_CONTENT)
}
