use axum::extract::{Path, State};
use axum::http::header::{self, HeaderName};
use axum::Json;
use uuid::Uuid;

use storyboard_core::models::{BoardColumn, BoardView, PrdView, Project, StoryStatus};
use storyboard_core::StoreError;

use super::error::ApiResult;
use super::AppState;
use crate::markdown;

/// The PRD document view: project, stories with criteria, running agents,
/// online users (best-effort registry snapshot) and team members.
pub async fn prd(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<PrdView>> {
    let project = require_project(&state, project_id)?;
    let stories = state.db.stories_with_criteria_by_project(project_id)?;
    let active_agents = state.db.running_runs_for_project(project_id)?;
    let team_members = state.db.members_by_project(project_id)?;
    let online_users = state.rooms.snapshot(&project_id.to_string());

    Ok(Json(PrdView {
        project,
        stories,
        active_agents,
        online_users,
        team_members,
    }))
}

pub async fn prd_markdown(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<([(HeaderName, &'static str); 1], String)> {
    let project = require_project(&state, project_id)?;
    let stories = state.db.stories_with_criteria_by_project(project_id)?;
    let rendered = markdown::render_prd(&project, &stories);
    Ok(([(header::CONTENT_TYPE, "text/markdown")], rendered))
}

/// Kanban view: one column per status in the fixed workflow order.
pub async fn board(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<BoardView>> {
    let project = require_project(&state, project_id)?;
    let stories = state.db.stories_by_project(project_id)?;
    let team_members = state.db.members_by_project(project_id)?;
    let online_users = state.rooms.snapshot(&project_id.to_string());

    let columns = StoryStatus::ALL
        .iter()
        .map(|&status| BoardColumn {
            status,
            stories: stories
                .iter()
                .filter(|s| s.status == status)
                .cloned()
                .collect(),
        })
        .collect();

    Ok(Json(BoardView {
        project,
        columns,
        online_users,
        team_members,
    }))
}

fn require_project(state: &AppState, id: Uuid) -> Result<Project, StoreError> {
    state.db.get_project(id)?.ok_or(StoreError::ProjectNotFound)
}
