use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRun {
    pub id: Uuid,
    pub story_id: Uuid,
    pub agent_type: AgentType,
    pub status: RunStatus,
    pub iteration: i64,
    pub max_iterations: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub exit_signal: Option<ExitSignal>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    Ralph,
    Reviewer,
    Writer,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ralph => "ralph",
            Self::Reviewer => "reviewer",
            Self::Writer => "writer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ralph" => Some(Self::Ralph),
            "reviewer" => Some(Self::Reviewer),
            "writer" => Some(Self::Writer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Complete,
    Blocked,
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Blocked => "blocked",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "complete" => Some(Self::Complete),
            "blocked" => Some(Self::Blocked),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// How an agent reported the end of its run. `COMPLETE` passes the story,
/// `BLOCKED` blocks it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitSignal {
    Complete,
    Blocked,
}

impl ExitSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "COMPLETE",
            Self::Blocked => "BLOCKED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "COMPLETE" => Some(Self::Complete),
            "BLOCKED" => Some(Self::Blocked),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    pub id: Uuid,
    pub run_id: Uuid,
    pub iteration: i64,
    pub action: String,
    pub files_changed: Vec<String>,
    pub commit_sha: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRunInput {
    pub story_id: Uuid,
    #[serde(default)]
    pub agent_type: Option<AgentType>,
    #[serde(default)]
    pub max_iterations: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordProgressInput {
    pub run_id: Uuid,
    pub iteration: i64,
    pub action: String,
    #[serde(default)]
    pub files_changed: Vec<String>,
    #[serde(default)]
    pub commit_sha: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRunInput {
    pub run_id: Uuid,
    pub exit_signal: ExitSignal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunWithProgress {
    #[serde(flatten)]
    pub run: AgentRun,
    pub progress: Vec<ProgressEntry>,
}
