use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use storyboard_core::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

/// [`StoreError`] adapted to the HTTP surface. Every error body is
/// `{"error": ...}`; an active-run conflict additionally carries the
/// existing run's id as `runId`.
#[derive(Debug)]
pub struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StoreError::ProjectNotFound
            | StoreError::StoryNotFound
            | StoreError::CriterionNotFound
            | StoreError::RunNotFound
            | StoreError::MemberNotFound => StatusCode::NOT_FOUND,
            StoreError::RunAlreadyActive { .. } => StatusCode::CONFLICT,
            StoreError::RunNotActive
            | StoreError::AlreadyAssigned
            | StoreError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
            StoreError::Sqlite(_) | StoreError::Json(_) => {
                tracing::error!("storage failure: {}", self.0);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response();
            }
        };

        let body = match &self.0 {
            StoreError::RunAlreadyActive { run_id } => {
                json!({ "error": self.0.to_string(), "runId": run_id })
            }
            _ => json!({ "error": self.0.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
