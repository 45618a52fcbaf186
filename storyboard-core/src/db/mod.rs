mod schema;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde_json::json;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::*;

const DEFAULT_MAX_ITERATIONS: i64 = 30;

/// Colors handed out to team members created without an explicit one.
const MEMBER_COLORS: [&str; 6] = [
    "#f97316", "#8b5cf6", "#06b6d4", "#ec4899", "#84cc16", "#eab308",
];

/// The storage collaborator: all domain state behind one SQLite connection.
///
/// Every compound operation (the start-run check-then-insert, the criterion
/// write plus auto-transition) runs as a single method body holding the
/// connection lock, inside one transaction, so concurrent requests against
/// the same story serialize at this boundary. The partial unique index
/// `idx_one_running_agent` backs the single-active-run invariant at the
/// schema level as well.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database under the platform data directory.
    pub fn open_default() -> anyhow::Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "storyboard")
            .context("Could not determine data directory")?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;
        Self::open(data_dir.join("storyboard.db"))
    }

    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Transient store, used by tests and `serve --ephemeral`.
    pub fn open_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> anyhow::Result<()> {
        self.conn().execute_batch(schema::SCHEMA)?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Projects
    // ------------------------------------------------------------------

    pub fn create_project(&self, input: CreateProjectInput) -> StoreResult<Project> {
        let project = Project {
            id: Uuid::new_v4(),
            name: input.name.clone(),
            goal: input.goal.clone(),
            tech_stack: input.tech_stack.clone(),
            created_at: Utc::now(),
            created_by: "system".to_string(),
        };

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO projects (id, name, goal, tech_stack, created_at, created_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                project.id.to_string(),
                project.name,
                project.goal,
                serde_json::to_string(&project.tech_stack)?,
                project.created_at.to_rfc3339(),
                project.created_by,
            ],
        )?;
        record_event(
            &tx,
            EventType::ProjectCreated,
            ActorType::User,
            "system",
            "project",
            &project.id.to_string(),
            project.id,
            serde_json::to_value(&input)?,
        )?;
        tx.commit()?;

        tracing::debug!(project_id = %project.id, "created project");
        Ok(project)
    }

    pub fn get_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        let conn = self.conn();
        project_row(&conn, id)
    }

    pub fn list_projects(&self) -> StoreResult<Vec<Project>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, goal, tech_stack, created_at, created_by FROM projects ORDER BY rowid",
        )?;
        let projects = stmt
            .query_map([], row_to_project)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    // ------------------------------------------------------------------
    // Stories
    // ------------------------------------------------------------------

    /// Create a story in `draft` with one unpassed criterion per description.
    /// Referential integrity is enforced: the project must exist.
    pub fn create_story(&self, input: CreateStoryInput) -> StoreResult<StoryWithCriteria> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if project_row(&tx, input.project_id)?.is_none() {
            return Err(StoreError::ProjectNotFound);
        }

        let story = Story {
            id: Uuid::new_v4(),
            project_id: input.project_id,
            priority: input.priority,
            title: input.title.clone(),
            description: input.description.clone(),
            status: StoryStatus::Draft,
            assigned_agent: None,
            assignees: Vec::new(),
            approved_by: Vec::new(),
        };
        tx.execute(
            "INSERT INTO stories (id, project_id, priority, title, description, status, assigned_agent, approved_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, '[]')",
            params![
                story.id.to_string(),
                story.project_id.to_string(),
                story.priority,
                story.title,
                story.description,
                story.status.as_str(),
            ],
        )?;

        let mut criteria = Vec::with_capacity(input.criteria.len());
        for description in &input.criteria {
            criteria.push(insert_criterion(&tx, story.id, description)?);
        }

        record_event(
            &tx,
            EventType::StoryCreated,
            ActorType::User,
            "system",
            "story",
            &story.id.to_string(),
            story.project_id,
            serde_json::to_value(&input)?,
        )?;
        tx.commit()?;

        tracing::debug!(story_id = %story.id, criteria = criteria.len(), "created story");
        Ok(StoryWithCriteria { story, criteria })
    }

    pub fn get_story(&self, id: Uuid) -> StoreResult<Option<Story>> {
        let conn = self.conn();
        story_row(&conn, id)
    }

    pub fn get_story_with_criteria(&self, id: Uuid) -> StoreResult<Option<StoryWithCriteria>> {
        let conn = self.conn();
        let Some(story) = story_row(&conn, id)? else {
            return Ok(None);
        };
        let criteria = criteria_rows(&conn, story.id)?;
        Ok(Some(StoryWithCriteria { story, criteria }))
    }

    pub fn stories_by_project(&self, project_id: Uuid) -> StoreResult<Vec<Story>> {
        let conn = self.conn();
        stories_for_project(&conn, project_id)
    }

    pub fn stories_with_criteria_by_project(
        &self,
        project_id: Uuid,
    ) -> StoreResult<Vec<StoryWithCriteria>> {
        let conn = self.conn();
        let stories = stories_for_project(&conn, project_id)?;
        let mut out = Vec::with_capacity(stories.len());
        for story in stories {
            let criteria = criteria_rows(&conn, story.id)?;
            out.push(StoryWithCriteria { story, criteria });
        }
        Ok(out)
    }

    /// Merge the provided fields. An explicit `status` is a direct,
    /// unchecked transition (manual override path).
    pub fn update_story(&self, id: Uuid, input: UpdateStoryInput) -> StoreResult<Story> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let current = story_row(&tx, id)?.ok_or(StoreError::StoryNotFound)?;
        let title = input.title.clone().unwrap_or_else(|| current.title.clone());
        let description = input
            .description
            .clone()
            .unwrap_or_else(|| current.description.clone());
        let priority = input.priority.unwrap_or(current.priority);
        let status = input.status.unwrap_or(current.status);

        tx.execute(
            "UPDATE stories SET title = ?2, description = ?3, priority = ?4, status = ?5 WHERE id = ?1",
            params![
                id.to_string(),
                title,
                description,
                priority,
                status.as_str()
            ],
        )?;

        match input.status {
            Some(new_status) if new_status != current.status => record_event(
                &tx,
                EventType::StoryStatusChanged,
                ActorType::User,
                "system",
                "story",
                &id.to_string(),
                current.project_id,
                json!({
                    "status": new_status.as_str(),
                    "previousStatus": current.status.as_str(),
                }),
            )?,
            _ => record_event(
                &tx,
                EventType::StoryUpdated,
                ActorType::User,
                "system",
                "story",
                &id.to_string(),
                current.project_id,
                serde_json::to_value(&input)?,
            )?,
        }

        let updated = story_row(&tx, id)?.ok_or(StoreError::StoryNotFound)?;
        tx.commit()?;
        Ok(updated)
    }

    /// `draft → approved`; any other source status is rejected.
    pub fn approve_story(&self, id: Uuid, approved_by: &str) -> StoreResult<Story> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let story = story_row(&tx, id)?.ok_or(StoreError::StoryNotFound)?;
        if story.status != StoryStatus::Draft {
            return Err(StoreError::InvalidTransition { from: story.status });
        }

        let mut approvers = story.approved_by.clone();
        if !approvers.iter().any(|a| a == approved_by) {
            approvers.push(approved_by.to_string());
        }
        tx.execute(
            "UPDATE stories SET status = ?2, approved_by = ?3 WHERE id = ?1",
            params![
                id.to_string(),
                StoryStatus::Approved.as_str(),
                serde_json::to_string(&approvers)?,
            ],
        )?;
        record_event(
            &tx,
            EventType::StoryStatusChanged,
            ActorType::User,
            approved_by,
            "story",
            &id.to_string(),
            story.project_id,
            json!({
                "status": StoryStatus::Approved.as_str(),
                "previousStatus": StoryStatus::Draft.as_str(),
            }),
        )?;

        let updated = story_row(&tx, id)?.ok_or(StoreError::StoryNotFound)?;
        tx.commit()?;
        Ok(updated)
    }

    /// Copy the member's snapshot into the story's assignee set. Assigning
    /// an already-assigned member is an error; the set is unchanged.
    pub fn assign_member(&self, story_id: Uuid, member_id: Uuid) -> StoreResult<Story> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let story = story_row(&tx, story_id)?.ok_or(StoreError::StoryNotFound)?;
        let member = tx
            .query_row(
                "SELECT id, project_id, member_type, name, color, avatar FROM team_members
                 WHERE id = ?1 AND project_id = ?2",
                params![member_id.to_string(), story.project_id.to_string()],
                row_to_member,
            )
            .optional()?
            .ok_or(StoreError::MemberNotFound)?;

        let already: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM story_assignees WHERE story_id = ?1 AND member_id = ?2",
                params![story_id.to_string(), member_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if already.is_some() {
            return Err(StoreError::AlreadyAssigned);
        }

        tx.execute(
            "INSERT INTO story_assignees (story_id, member_id, member_type, name, color, avatar, assigned_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                story_id.to_string(),
                member.id.to_string(),
                member.member_type.as_str(),
                member.name,
                member.color,
                member.avatar,
                Utc::now().to_rfc3339(),
            ],
        )?;

        let updated = story_row(&tx, story_id)?.ok_or(StoreError::StoryNotFound)?;
        tx.commit()?;
        Ok(updated)
    }

    /// Unassigning a member that is not assigned is a no-op.
    pub fn unassign_member(&self, story_id: Uuid, member_id: Uuid) -> StoreResult<Story> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if story_row(&tx, story_id)?.is_none() {
            return Err(StoreError::StoryNotFound);
        }
        tx.execute(
            "DELETE FROM story_assignees WHERE story_id = ?1 AND member_id = ?2",
            params![story_id.to_string(), member_id.to_string()],
        )?;

        let updated = story_row(&tx, story_id)?.ok_or(StoreError::StoryNotFound)?;
        tx.commit()?;
        Ok(updated)
    }

    // ------------------------------------------------------------------
    // Acceptance criteria
    // ------------------------------------------------------------------

    pub fn add_criterion(
        &self,
        story_id: Uuid,
        input: CreateCriterionInput,
    ) -> StoreResult<AcceptanceCriterion> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let story = story_row(&tx, story_id)?.ok_or(StoreError::StoryNotFound)?;
        let criterion = insert_criterion(&tx, story_id, &input.description)?;
        record_event(
            &tx,
            EventType::CriteriaCreated,
            ActorType::User,
            "system",
            "criteria",
            &criterion.id.to_string(),
            story.project_id,
            serde_json::to_value(&input)?,
        )?;
        tx.commit()?;
        Ok(criterion)
    }

    pub fn criteria_by_story(&self, story_id: Uuid) -> StoreResult<Vec<AcceptanceCriterion>> {
        let conn = self.conn();
        criteria_rows(&conn, story_id)
    }

    /// Merge the provided fields; a `passed` write eagerly re-evaluates the
    /// owning story. All criteria passed (and there is at least one) moves
    /// the story to `passed`; unchecking a criterion of a `passed` story
    /// reverts it to `in_progress`.
    pub fn update_criterion(
        &self,
        id: Uuid,
        input: UpdateCriterionInput,
    ) -> StoreResult<AcceptanceCriterion> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let existing = criterion_row(&tx, id)?.ok_or(StoreError::CriterionNotFound)?;
        let description = input
            .description
            .clone()
            .unwrap_or_else(|| existing.description.clone());
        let passed = input.passed.unwrap_or(existing.passed);
        let evidence = input.evidence.clone().or_else(|| existing.evidence.clone());

        tx.execute(
            "UPDATE acceptance_criteria SET description = ?2, passed = ?3, evidence = ?4 WHERE id = ?1",
            params![id.to_string(), description, passed, evidence],
        )?;

        let story = story_row(&tx, existing.story_id)?.ok_or(StoreError::StoryNotFound)?;
        let newly_passed = input.passed == Some(true) && !existing.passed;
        record_event(
            &tx,
            if newly_passed {
                EventType::CriteriaPassed
            } else {
                EventType::CriteriaUpdated
            },
            ActorType::User,
            "system",
            "criteria",
            &id.to_string(),
            story.project_id,
            serde_json::to_value(&input)?,
        )?;

        if let Some(flag) = input.passed {
            evaluate_story_transition(&tx, &story, flag)?;
        }

        let updated = criterion_row(&tx, id)?.ok_or(StoreError::CriterionNotFound)?;
        tx.commit()?;
        Ok(updated)
    }

    // ------------------------------------------------------------------
    // Agent runs
    // ------------------------------------------------------------------

    /// Start a run against a story. At most one run with status `running`
    /// may target a story at any time; the losing caller gets the existing
    /// run's id back. The check and the insert share one transaction.
    pub fn start_run(&self, input: StartRunInput) -> StoreResult<AgentRun> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let story = story_row(&tx, input.story_id)?.ok_or(StoreError::StoryNotFound)?;
        if let Some(run_id) = running_run_id(&tx, input.story_id)? {
            return Err(StoreError::RunAlreadyActive { run_id });
        }

        let run = AgentRun {
            id: Uuid::new_v4(),
            story_id: input.story_id,
            agent_type: input.agent_type.unwrap_or(AgentType::Ralph),
            status: RunStatus::Running,
            iteration: 0,
            max_iterations: input.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
            started_at: Utc::now(),
            ended_at: None,
            exit_signal: None,
        };
        tx.execute(
            "INSERT INTO agent_runs (id, story_id, agent_type, status, iteration, max_iterations, started_at, ended_at, exit_signal)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, NULL)",
            params![
                run.id.to_string(),
                run.story_id.to_string(),
                run.agent_type.as_str(),
                run.status.as_str(),
                run.iteration,
                run.max_iterations,
                run.started_at.to_rfc3339(),
            ],
        )?;
        tx.execute(
            "UPDATE stories SET status = ?2, assigned_agent = ?3 WHERE id = ?1",
            params![
                run.story_id.to_string(),
                StoryStatus::InProgress.as_str(),
                run.id.to_string(),
            ],
        )?;
        record_event(
            &tx,
            EventType::AgentStarted,
            ActorType::Agent,
            &run.id.to_string(),
            "story",
            &run.story_id.to_string(),
            story.project_id,
            json!({ "runId": run.id, "agentType": run.agent_type.as_str() }),
        )?;
        tx.commit()?;

        tracing::debug!(run_id = %run.id, story_id = %run.story_id, "started agent run");
        Ok(run)
    }

    /// Append a progress entry and advance the run's iteration counter.
    /// Out-of-order reports never move the counter backwards; the entry
    /// itself is recorded as reported.
    pub fn record_progress(&self, input: RecordProgressInput) -> StoreResult<ProgressEntry> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let run = run_row(&tx, input.run_id)?.ok_or(StoreError::RunNotFound)?;
        if run.status != RunStatus::Running {
            return Err(StoreError::RunNotActive);
        }
        let story = story_row(&tx, run.story_id)?.ok_or(StoreError::StoryNotFound)?;

        let entry = ProgressEntry {
            id: Uuid::new_v4(),
            run_id: input.run_id,
            iteration: input.iteration,
            action: input.action.clone(),
            files_changed: input.files_changed.clone(),
            commit_sha: input.commit_sha.clone(),
            timestamp: Utc::now(),
        };
        tx.execute(
            "INSERT INTO progress_entries (id, run_id, iteration, action, files_changed, commit_sha, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id.to_string(),
                entry.run_id.to_string(),
                entry.iteration,
                entry.action,
                serde_json::to_string(&entry.files_changed)?,
                entry.commit_sha,
                entry.timestamp.to_rfc3339(),
            ],
        )?;
        tx.execute(
            "UPDATE agent_runs SET iteration = ?2 WHERE id = ?1",
            params![input.run_id.to_string(), run.iteration.max(input.iteration)],
        )?;
        record_event(
            &tx,
            EventType::AgentProgress,
            ActorType::Agent,
            &input.run_id.to_string(),
            "story",
            &run.story_id.to_string(),
            story.project_id,
            serde_json::to_value(&input)?,
        )?;
        tx.commit()?;
        Ok(entry)
    }

    /// Terminate a run. `COMPLETE` passes the story, `BLOCKED` blocks it;
    /// either way the story stops being occupied by the run.
    pub fn complete_run(&self, input: CompleteRunInput) -> StoreResult<AgentRun> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let run = run_row(&tx, input.run_id)?.ok_or(StoreError::RunNotFound)?;
        let story = story_row(&tx, run.story_id)?.ok_or(StoreError::StoryNotFound)?;

        let (run_status, story_status, event_type) = match input.exit_signal {
            ExitSignal::Complete => (
                RunStatus::Complete,
                StoryStatus::Passed,
                EventType::AgentCompleted,
            ),
            ExitSignal::Blocked => (
                RunStatus::Blocked,
                StoryStatus::Blocked,
                EventType::AgentBlocked,
            ),
        };

        let ended_at = Utc::now();
        tx.execute(
            "UPDATE agent_runs SET status = ?2, ended_at = ?3, exit_signal = ?4 WHERE id = ?1",
            params![
                input.run_id.to_string(),
                run_status.as_str(),
                ended_at.to_rfc3339(),
                input.exit_signal.as_str(),
            ],
        )?;
        tx.execute(
            "UPDATE stories SET status = ?2, assigned_agent = NULL WHERE id = ?1",
            params![run.story_id.to_string(), story_status.as_str()],
        )?;
        record_event(
            &tx,
            event_type,
            ActorType::Agent,
            &input.run_id.to_string(),
            "story",
            &run.story_id.to_string(),
            story.project_id,
            json!({ "exitSignal": input.exit_signal.as_str() }),
        )?;

        let updated = run_row(&tx, input.run_id)?.ok_or(StoreError::RunNotFound)?;
        tx.commit()?;

        tracing::debug!(run_id = %input.run_id, signal = input.exit_signal.as_str(), "completed agent run");
        Ok(updated)
    }

    pub fn get_run(&self, id: Uuid) -> StoreResult<Option<AgentRun>> {
        let conn = self.conn();
        run_row(&conn, id)
    }

    pub fn get_run_with_progress(&self, id: Uuid) -> StoreResult<Option<RunWithProgress>> {
        let conn = self.conn();
        let Some(run) = run_row(&conn, id)? else {
            return Ok(None);
        };
        let mut stmt = conn.prepare(
            "SELECT id, run_id, iteration, action, files_changed, commit_sha, timestamp
             FROM progress_entries WHERE run_id = ?1 ORDER BY rowid",
        )?;
        let progress = stmt
            .query_map(params![id.to_string()], row_to_progress)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Some(RunWithProgress { run, progress }))
    }

    pub fn running_runs_for_project(&self, project_id: Uuid) -> StoreResult<Vec<AgentRun>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT r.id, r.story_id, r.agent_type, r.status, r.iteration, r.max_iterations,
                    r.started_at, r.ended_at, r.exit_signal
             FROM agent_runs r JOIN stories s ON r.story_id = s.id
             WHERE s.project_id = ?1 AND r.status = 'running' ORDER BY r.rowid",
        )?;
        let runs = stmt
            .query_map(params![project_id.to_string()], row_to_run)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runs)
    }

    // ------------------------------------------------------------------
    // Team members
    // ------------------------------------------------------------------

    pub fn create_member(
        &self,
        project_id: Uuid,
        input: CreateMemberInput,
    ) -> StoreResult<TeamMember> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if project_row(&tx, project_id)?.is_none() {
            return Err(StoreError::ProjectNotFound);
        }
        let color = match input.color {
            Some(color) => color,
            None => {
                let count: i64 = tx.query_row(
                    "SELECT COUNT(*) FROM team_members WHERE project_id = ?1",
                    params![project_id.to_string()],
                    |row| row.get(0),
                )?;
                MEMBER_COLORS[count as usize % MEMBER_COLORS.len()].to_string()
            }
        };

        let member = TeamMember {
            id: Uuid::new_v4(),
            project_id,
            member_type: input.member_type,
            name: input.name,
            color,
            avatar: input.avatar,
        };
        tx.execute(
            "INSERT INTO team_members (id, project_id, member_type, name, color, avatar)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                member.id.to_string(),
                member.project_id.to_string(),
                member.member_type.as_str(),
                member.name,
                member.color,
                member.avatar,
            ],
        )?;
        tx.commit()?;
        Ok(member)
    }

    pub fn members_by_project(&self, project_id: Uuid) -> StoreResult<Vec<TeamMember>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, project_id, member_type, name, color, avatar FROM team_members
             WHERE project_id = ?1 ORDER BY rowid",
        )?;
        let members = stmt
            .query_map(params![project_id.to_string()], row_to_member)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(members)
    }

    /// Removes the member. Assignee snapshots on stories are copies and
    /// survive the deletion.
    pub fn delete_member(&self, id: Uuid) -> StoreResult<()> {
        let conn = self.conn();
        let deleted = conn.execute(
            "DELETE FROM team_members WHERE id = ?1",
            params![id.to_string()],
        )?;
        if deleted == 0 {
            return Err(StoreError::MemberNotFound);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn events_by_project(&self, project_id: Uuid) -> StoreResult<Vec<DomainEvent>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, event_type, actor_type, actor_id, target_type, target_id, project_id, payload, timestamp
             FROM events WHERE project_id = ?1 ORDER BY rowid",
        )?;
        let events = stmt
            .query_map(params![project_id.to_string()], row_to_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }
}

// ----------------------------------------------------------------------
// Shared statement helpers (used inside and outside transactions)
// ----------------------------------------------------------------------

fn project_row(conn: &Connection, id: Uuid) -> StoreResult<Option<Project>> {
    let project = conn
        .query_row(
            "SELECT id, name, goal, tech_stack, created_at, created_by FROM projects WHERE id = ?1",
            params![id.to_string()],
            row_to_project,
        )
        .optional()?;
    Ok(project)
}

fn story_row(conn: &Connection, id: Uuid) -> StoreResult<Option<Story>> {
    let story = conn
        .query_row(
            "SELECT id, project_id, priority, title, description, status, assigned_agent, approved_by
             FROM stories WHERE id = ?1",
            params![id.to_string()],
            row_to_story,
        )
        .optional()?;
    match story {
        Some(mut story) => {
            story.assignees = load_assignees(conn, story.id)?;
            Ok(Some(story))
        }
        None => Ok(None),
    }
}

fn stories_for_project(conn: &Connection, project_id: Uuid) -> StoreResult<Vec<Story>> {
    let mut stmt = conn.prepare(
        "SELECT id, project_id, priority, title, description, status, assigned_agent, approved_by
         FROM stories WHERE project_id = ?1 ORDER BY rowid",
    )?;
    let mut stories = stmt
        .query_map(params![project_id.to_string()], row_to_story)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    for story in &mut stories {
        story.assignees = load_assignees(conn, story.id)?;
    }
    Ok(stories)
}

fn load_assignees(conn: &Connection, story_id: Uuid) -> StoreResult<Vec<Assignee>> {
    let mut stmt = conn.prepare(
        "SELECT member_id, member_type, name, color, avatar FROM story_assignees
         WHERE story_id = ?1 ORDER BY rowid",
    )?;
    let assignees = stmt
        .query_map(params![story_id.to_string()], |row| {
            Ok(Assignee {
                member_id: parse_uuid(&row.get::<_, String>(0)?)?,
                member_type: parse_member_type(&row.get::<_, String>(1)?)?,
                name: row.get(2)?,
                color: row.get(3)?,
                avatar: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(assignees)
}

fn criterion_row(conn: &Connection, id: Uuid) -> StoreResult<Option<AcceptanceCriterion>> {
    let criterion = conn
        .query_row(
            "SELECT id, story_id, description, passed, evidence FROM acceptance_criteria WHERE id = ?1",
            params![id.to_string()],
            row_to_criterion,
        )
        .optional()?;
    Ok(criterion)
}

fn criteria_rows(conn: &Connection, story_id: Uuid) -> StoreResult<Vec<AcceptanceCriterion>> {
    let mut stmt = conn.prepare(
        "SELECT id, story_id, description, passed, evidence FROM acceptance_criteria
         WHERE story_id = ?1 ORDER BY rowid",
    )?;
    let criteria = stmt
        .query_map(params![story_id.to_string()], row_to_criterion)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(criteria)
}

fn insert_criterion(
    conn: &Connection,
    story_id: Uuid,
    description: &str,
) -> StoreResult<AcceptanceCriterion> {
    let criterion = AcceptanceCriterion {
        id: Uuid::new_v4(),
        story_id,
        description: description.to_string(),
        passed: false,
        evidence: None,
    };
    conn.execute(
        "INSERT INTO acceptance_criteria (id, story_id, description, passed, evidence)
         VALUES (?1, ?2, ?3, 0, NULL)",
        params![
            criterion.id.to_string(),
            criterion.story_id.to_string(),
            criterion.description,
        ],
    )?;
    Ok(criterion)
}

fn run_row(conn: &Connection, id: Uuid) -> StoreResult<Option<AgentRun>> {
    let run = conn
        .query_row(
            "SELECT id, story_id, agent_type, status, iteration, max_iterations, started_at, ended_at, exit_signal
             FROM agent_runs WHERE id = ?1",
            params![id.to_string()],
            row_to_run,
        )
        .optional()?;
    Ok(run)
}

fn running_run_id(conn: &Connection, story_id: Uuid) -> StoreResult<Option<Uuid>> {
    let id: Option<String> = conn
        .query_row(
            "SELECT id FROM agent_runs WHERE story_id = ?1 AND status = 'running'",
            params![story_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    match id {
        Some(id) => Ok(Some(parse_uuid(&id)?)),
        None => Ok(None),
    }
}

/// The eager post-write hook: runs inside the criterion-update transaction.
/// A story with zero criteria never auto-passes.
fn evaluate_story_transition(
    conn: &Connection,
    story: &Story,
    criterion_passed: bool,
) -> StoreResult<()> {
    let criteria = criteria_rows(conn, story.id)?;
    let new_status = if criterion_passed {
        let all_passed = !criteria.is_empty() && criteria.iter().all(|c| c.passed);
        (all_passed && story.status != StoryStatus::Passed).then_some(StoryStatus::Passed)
    } else {
        (story.status == StoryStatus::Passed).then_some(StoryStatus::InProgress)
    };

    if let Some(status) = new_status {
        conn.execute(
            "UPDATE stories SET status = ?2 WHERE id = ?1",
            params![story.id.to_string(), status.as_str()],
        )?;
        record_event(
            conn,
            EventType::StoryStatusChanged,
            ActorType::User,
            "system",
            "story",
            &story.id.to_string(),
            story.project_id,
            json!({
                "status": status.as_str(),
                "previousStatus": story.status.as_str(),
            }),
        )?;
        tracing::debug!(story_id = %story.id, status = status.as_str(), "auto-transitioned story");
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn record_event(
    conn: &Connection,
    event_type: EventType,
    actor_type: ActorType,
    actor_id: &str,
    target_type: &str,
    target_id: &str,
    project_id: Uuid,
    payload: serde_json::Value,
) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO events (id, event_type, actor_type, actor_id, target_type, target_id, project_id, payload, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            Uuid::new_v4().to_string(),
            event_type.as_str(),
            actor_type.as_str(),
            actor_id,
            target_type,
            target_id,
            project_id.to_string(),
            payload.to_string(),
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

// ----------------------------------------------------------------------
// Row mapping
// ----------------------------------------------------------------------

fn row_to_project(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        goal: row.get(2)?,
        tech_stack: parse_json(&row.get::<_, String>(3)?)?,
        created_at: parse_time(&row.get::<_, String>(4)?)?,
        created_by: row.get(5)?,
    })
}

fn row_to_story(row: &Row) -> rusqlite::Result<Story> {
    let status: String = row.get(5)?;
    let assigned_agent: Option<String> = row.get(6)?;
    Ok(Story {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        project_id: parse_uuid(&row.get::<_, String>(1)?)?,
        priority: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        status: StoryStatus::from_str(&status)
            .ok_or_else(|| bad_column(format!("unknown story status: {status}")))?,
        assigned_agent: assigned_agent.as_deref().map(parse_uuid).transpose()?,
        assignees: Vec::new(),
        approved_by: parse_json(&row.get::<_, String>(7)?)?,
    })
}

fn row_to_criterion(row: &Row) -> rusqlite::Result<AcceptanceCriterion> {
    Ok(AcceptanceCriterion {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        story_id: parse_uuid(&row.get::<_, String>(1)?)?,
        description: row.get(2)?,
        passed: row.get(3)?,
        evidence: row.get(4)?,
    })
}

fn row_to_run(row: &Row) -> rusqlite::Result<AgentRun> {
    let agent_type: String = row.get(2)?;
    let status: String = row.get(3)?;
    let ended_at: Option<String> = row.get(7)?;
    let exit_signal: Option<String> = row.get(8)?;
    Ok(AgentRun {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        story_id: parse_uuid(&row.get::<_, String>(1)?)?,
        agent_type: AgentType::from_str(&agent_type)
            .ok_or_else(|| bad_column(format!("unknown agent type: {agent_type}")))?,
        status: RunStatus::from_str(&status)
            .ok_or_else(|| bad_column(format!("unknown run status: {status}")))?,
        iteration: row.get(4)?,
        max_iterations: row.get(5)?,
        started_at: parse_time(&row.get::<_, String>(6)?)?,
        ended_at: ended_at.as_deref().map(parse_time).transpose()?,
        exit_signal: exit_signal
            .as_deref()
            .map(|s| {
                ExitSignal::from_str(s).ok_or_else(|| bad_column(format!("unknown exit signal: {s}")))
            })
            .transpose()?,
    })
}

fn row_to_progress(row: &Row) -> rusqlite::Result<ProgressEntry> {
    Ok(ProgressEntry {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        run_id: parse_uuid(&row.get::<_, String>(1)?)?,
        iteration: row.get(2)?,
        action: row.get(3)?,
        files_changed: parse_json(&row.get::<_, String>(4)?)?,
        commit_sha: row.get(5)?,
        timestamp: parse_time(&row.get::<_, String>(6)?)?,
    })
}

fn row_to_member(row: &Row) -> rusqlite::Result<TeamMember> {
    Ok(TeamMember {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        project_id: parse_uuid(&row.get::<_, String>(1)?)?,
        member_type: parse_member_type(&row.get::<_, String>(2)?)?,
        name: row.get(3)?,
        color: row.get(4)?,
        avatar: row.get(5)?,
    })
}

fn row_to_event(row: &Row) -> rusqlite::Result<DomainEvent> {
    let event_type: String = row.get(1)?;
    let actor_type: String = row.get(2)?;
    Ok(DomainEvent {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        event_type: EventType::from_str(&event_type)
            .ok_or_else(|| bad_column(format!("unknown event type: {event_type}")))?,
        actor_type: ActorType::from_str(&actor_type)
            .ok_or_else(|| bad_column(format!("unknown actor type: {actor_type}")))?,
        actor_id: row.get(3)?,
        target_type: row.get(4)?,
        target_id: row.get(5)?,
        project_id: parse_uuid(&row.get::<_, String>(6)?)?,
        payload: parse_json(&row.get::<_, String>(7)?)?,
        timestamp: parse_time(&row.get::<_, String>(8)?)?,
    })
}

fn parse_member_type(s: &str) -> rusqlite::Result<MemberType> {
    MemberType::from_str(s).ok_or_else(|| bad_column(format!("unknown member type: {s}")))
}

fn parse_uuid(s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| bad_column(format!("invalid uuid {s}: {e}")))
}

fn parse_time(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| bad_column(format!("invalid timestamp {s}: {e}")))
}

fn parse_json<T: DeserializeOwned>(s: &str) -> rusqlite::Result<T> {
    serde_json::from_str(s).map_err(|e| bad_column(format!("invalid json column: {e}")))
}

fn bad_column(msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, msg.into())
}
