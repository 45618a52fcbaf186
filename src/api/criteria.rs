use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use storyboard_core::models::{
    AcceptanceCriterion, CreateCriterionInput, UpdateCriterionInput,
};

use super::error::ApiResult;
use super::AppState;

pub async fn add_criterion(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
    Json(input): Json<CreateCriterionInput>,
) -> ApiResult<(StatusCode, Json<AcceptanceCriterion>)> {
    let criterion = state.db.add_criterion(story_id, input)?;
    Ok((StatusCode::CREATED, Json(criterion)))
}

/// A `passed` write here eagerly re-evaluates the owning story's status.
pub async fn update_criterion(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateCriterionInput>,
) -> ApiResult<Json<AcceptanceCriterion>> {
    Ok(Json(state.db.update_criterion(id, input)?))
}
