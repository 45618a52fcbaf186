//! REST surface: CRUD over projects, stories, criteria, team members and
//! agent runs, plus the derived PRD/board views. The presence WebSocket
//! upgrade lives on the same router at `/party/{room_id}`.

mod agent;
mod criteria;
mod error;
mod projects;
mod stories;
mod team;
mod views;

pub use error::{ApiError, ApiResult};

use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use storyboard_core::db::Database;

use crate::party::{self, RoomRegistry};

/// Shared state for every handler: the store plus the in-process presence
/// registry. The views read the registry to fill `onlineUsers`; there is no
/// transactional coupling between the two.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub rooms: RoomRegistry,
}

pub fn create_router(db: Database, rooms: RoomRegistry) -> Router {
    let state = AppState { db, rooms };

    Router::new()
        .route("/", get(health))
        .route(
            "/projects",
            post(projects::create_project).get(projects::list_projects),
        )
        .route("/projects/{id}", get(projects::get_project))
        .route(
            "/projects/{id}/team",
            get(team::list_members).post(team::create_member),
        )
        .route("/projects/{id}/events", get(projects::list_events))
        .route("/team/{id}", delete(team::delete_member))
        .route("/stories", post(stories::create_story))
        .route(
            "/stories/{id}",
            get(stories::get_story).patch(stories::update_story),
        )
        .route("/stories/project/{project_id}", get(stories::list_by_project))
        .route("/stories/{id}/approve", post(stories::approve_story))
        .route("/stories/{id}/criteria", post(criteria::add_criterion))
        .route("/stories/{id}/assign", post(stories::assign_member))
        .route("/stories/{id}/unassign", post(stories::unassign_member))
        .route("/criteria/{id}", patch(criteria::update_criterion))
        .route("/agent/start", post(agent::start_run))
        .route("/agent/progress", post(agent::record_progress))
        .route("/agent/complete", post(agent::complete_run))
        .route("/agent/run/{id}", get(agent::get_run))
        .route("/views/prd/{project_id}", get(views::prd))
        .route("/views/prd/{project_id}/markdown", get(views::prd_markdown))
        .route("/views/board/{project_id}", get(views::board))
        .route("/party/{room_id}", get(party::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "service": "storyboard" }))
}
