use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use storyboard_core::models::{
    CreateStoryInput, Story, StoryWithCriteria, UpdateStoryInput,
};
use storyboard_core::StoreError;

use super::error::ApiResult;
use super::AppState;

pub async fn create_story(
    State(state): State<AppState>,
    Json(input): Json<CreateStoryInput>,
) -> ApiResult<(StatusCode, Json<StoryWithCriteria>)> {
    let story = state.db.create_story(input)?;
    Ok((StatusCode::CREATED, Json(story)))
}

pub async fn get_story(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StoryWithCriteria>> {
    let story = state
        .db
        .get_story_with_criteria(id)?
        .ok_or(StoreError::StoryNotFound)?;
    Ok(Json(story))
}

pub async fn update_story(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateStoryInput>,
) -> ApiResult<Json<Story>> {
    Ok(Json(state.db.update_story(id, input)?))
}

pub async fn list_by_project(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Story>>> {
    Ok(Json(state.db.stories_by_project(project_id)?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveBody {
    #[serde(default)]
    pub approved_by: Option<String>,
}

pub async fn approve_story(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ApproveBody>,
) -> ApiResult<Json<Story>> {
    let approver = body.approved_by.as_deref().unwrap_or("system");
    Ok(Json(state.db.approve_story(id, approver)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberBody {
    pub member_id: Uuid,
}

pub async fn assign_member(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<MemberBody>,
) -> ApiResult<Json<Story>> {
    Ok(Json(state.db.assign_member(id, body.member_id)?))
}

pub async fn unassign_member(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<MemberBody>,
) -> ApiResult<Json<Story>> {
    Ok(Json(state.db.unassign_member(id, body.member_id)?))
}
