use serde::{Deserialize, Serialize};

use super::agent_run::AgentRun;
use super::member::TeamMember;
use super::presence::UserPresence;
use super::project::Project;
use super::story::{Story, StoryStatus, StoryWithCriteria};

/// The PRD document view: everything a reader needs to render one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrdView {
    pub project: Project,
    pub stories: Vec<StoryWithCriteria>,
    /// Runs with status `running` targeting this project's stories.
    pub active_agents: Vec<AgentRun>,
    pub online_users: Vec<UserPresence>,
    pub team_members: Vec<TeamMember>,
}

/// Kanban view: one column per status, fixed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub project: Project,
    pub columns: Vec<BoardColumn>,
    pub online_users: Vec<UserPresence>,
    pub team_members: Vec<TeamMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardColumn {
    pub status: StoryStatus,
    pub stories: Vec<Story>,
}
