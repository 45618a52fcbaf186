use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptanceCriterion {
    pub id: Uuid,
    pub story_id: Uuid,
    pub description: String,
    pub passed: bool,
    pub evidence: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCriterionInput {
    pub description: String,
}

/// Partial update; a `passed` write triggers the owning story's
/// auto-transition evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCriterionInput {
    pub description: Option<String>,
    pub passed: Option<bool>,
    pub evidence: Option<String>,
}
