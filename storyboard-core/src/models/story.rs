use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::criterion::AcceptanceCriterion;
use super::member::Assignee;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: Uuid,
    pub project_id: Uuid,
    pub priority: i64,
    pub title: String,
    pub description: String,
    pub status: StoryStatus,
    /// Id of the agent run currently occupying this story, if any.
    pub assigned_agent: Option<Uuid>,
    pub assignees: Vec<Assignee>,
    pub approved_by: Vec<String>,
}

/// Workflow states: `draft → approved → in_progress → {passed | blocked}`.
/// A new agent run moves a blocked story back to `in_progress`; unchecking a
/// criterion of a passed story does the same.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoryStatus {
    Draft,
    Approved,
    InProgress,
    Passed,
    Blocked,
}

impl StoryStatus {
    /// The five statuses in board-column order.
    pub const ALL: [StoryStatus; 5] = [
        Self::Draft,
        Self::Approved,
        Self::InProgress,
        Self::Passed,
        Self::Blocked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Approved => "approved",
            Self::InProgress => "in_progress",
            Self::Passed => "passed",
            Self::Blocked => "blocked",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "approved" => Some(Self::Approved),
            "in_progress" => Some(Self::InProgress),
            "passed" => Some(Self::Passed),
            "blocked" => Some(Self::Blocked),
            _ => None,
        }
    }
}

impl std::fmt::Display for StoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStoryInput {
    pub project_id: Uuid,
    pub title: String,
    pub description: String,
    pub priority: i64,
    /// One acceptance criterion is created per description, unpassed.
    #[serde(default)]
    pub criteria: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStoryInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<i64>,
    /// Direct, unchecked status write (manual override path).
    pub status: Option<StoryStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryWithCriteria {
    #[serde(flatten)]
    pub story: Story,
    pub criteria: Vec<AcceptanceCriterion>,
}
