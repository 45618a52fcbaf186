use thiserror::Error;
use uuid::Uuid;

use crate::models::StoryStatus;

/// Errors surfaced by [`crate::db::Database`] operations.
///
/// The NotFound/conflict variants are part of the API contract (they map
/// onto 404/409/400 responses); everything else is an internal failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Project not found")]
    ProjectNotFound,

    #[error("Story not found")]
    StoryNotFound,

    #[error("Criterion not found")]
    CriterionNotFound,

    #[error("Run not found")]
    RunNotFound,

    #[error("Team member not found")]
    MemberNotFound,

    /// A run with status `running` already targets the story; carries the
    /// existing run's id so callers can report it.
    #[error("Agent already running on this story")]
    RunAlreadyActive { run_id: Uuid },

    #[error("Run is not active")]
    RunNotActive,

    #[error("Member already assigned to this story")]
    AlreadyAssigned,

    #[error("Cannot approve story in status {from}")]
    InvalidTransition { from: StoryStatus },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
