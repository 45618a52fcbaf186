use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ephemeral per-participant state shared for collaboration awareness.
/// Never persisted; lives only in a room registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPresence {
    pub user_id: String,
    pub name: String,
    pub avatar: String,
    pub cursor: Option<CursorPosition>,
    pub viewing: ViewTarget,
    pub editing: Option<EditTarget>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub x: f64,
    pub y: f64,
}

/// What a participant is currently looking at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewTarget {
    #[serde(rename = "type")]
    pub kind: ViewTargetKind,
    pub id: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViewTargetKind {
    Project,
    Story,
}

/// A field-level editing lock advertisement (no enforcement, advisory only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditTarget {
    #[serde(rename = "type")]
    pub kind: EditTargetKind,
    pub id: String,
    pub field: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EditTargetKind {
    Story,
    Criteria,
}
