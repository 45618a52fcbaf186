use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only domain event, recorded in the same transaction as the
/// mutation it describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainEvent {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub actor_type: ActorType,
    pub actor_id: String,
    pub target_type: String,
    pub target_id: String,
    pub project_id: Uuid,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventType {
    #[serde(rename = "project.created")]
    ProjectCreated,
    #[serde(rename = "story.created")]
    StoryCreated,
    #[serde(rename = "story.updated")]
    StoryUpdated,
    #[serde(rename = "story.status_changed")]
    StoryStatusChanged,
    #[serde(rename = "criteria.created")]
    CriteriaCreated,
    #[serde(rename = "criteria.updated")]
    CriteriaUpdated,
    #[serde(rename = "criteria.passed")]
    CriteriaPassed,
    #[serde(rename = "agent.started")]
    AgentStarted,
    #[serde(rename = "agent.progress")]
    AgentProgress,
    #[serde(rename = "agent.completed")]
    AgentCompleted,
    #[serde(rename = "agent.blocked")]
    AgentBlocked,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectCreated => "project.created",
            Self::StoryCreated => "story.created",
            Self::StoryUpdated => "story.updated",
            Self::StoryStatusChanged => "story.status_changed",
            Self::CriteriaCreated => "criteria.created",
            Self::CriteriaUpdated => "criteria.updated",
            Self::CriteriaPassed => "criteria.passed",
            Self::AgentStarted => "agent.started",
            Self::AgentProgress => "agent.progress",
            Self::AgentCompleted => "agent.completed",
            Self::AgentBlocked => "agent.blocked",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "project.created" => Some(Self::ProjectCreated),
            "story.created" => Some(Self::StoryCreated),
            "story.updated" => Some(Self::StoryUpdated),
            "story.status_changed" => Some(Self::StoryStatusChanged),
            "criteria.created" => Some(Self::CriteriaCreated),
            "criteria.updated" => Some(Self::CriteriaUpdated),
            "criteria.passed" => Some(Self::CriteriaPassed),
            "agent.started" => Some(Self::AgentStarted),
            "agent.progress" => Some(Self::AgentProgress),
            "agent.completed" => Some(Self::AgentCompleted),
            "agent.blocked" => Some(Self::AgentBlocked),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    User,
    Agent,
}

impl ActorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "agent" => Some(Self::Agent),
            _ => None,
        }
    }
}
