pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    goal TEXT NOT NULL,
    tech_stack JSON NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    created_by TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS stories (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    priority INTEGER NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'approved', 'in_progress', 'passed', 'blocked')),
    assigned_agent TEXT,
    approved_by JSON NOT NULL DEFAULT '[]'
);

CREATE TABLE IF NOT EXISTS acceptance_criteria (
    id TEXT PRIMARY KEY,
    story_id TEXT NOT NULL REFERENCES stories(id) ON DELETE CASCADE,
    description TEXT NOT NULL,
    passed INTEGER NOT NULL DEFAULT 0,
    evidence TEXT
);

CREATE TABLE IF NOT EXISTS agent_runs (
    id TEXT PRIMARY KEY,
    story_id TEXT NOT NULL REFERENCES stories(id) ON DELETE CASCADE,
    agent_type TEXT NOT NULL CHECK (agent_type IN ('ralph', 'reviewer', 'writer')),
    status TEXT NOT NULL CHECK (status IN ('running', 'complete', 'blocked', 'cancelled')),
    iteration INTEGER NOT NULL DEFAULT 0,
    max_iterations INTEGER NOT NULL,
    started_at TEXT NOT NULL,
    ended_at TEXT,
    exit_signal TEXT CHECK (exit_signal IN ('COMPLETE', 'BLOCKED'))
);

CREATE TABLE IF NOT EXISTS progress_entries (
    id TEXT PRIMARY KEY,
    run_id TEXT NOT NULL REFERENCES agent_runs(id) ON DELETE CASCADE,
    iteration INTEGER NOT NULL,
    action TEXT NOT NULL,
    files_changed JSON NOT NULL DEFAULT '[]',
    commit_sha TEXT,
    timestamp TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS team_members (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    member_type TEXT NOT NULL CHECK (member_type IN ('human', 'agent')),
    name TEXT NOT NULL,
    color TEXT NOT NULL,
    avatar TEXT
);

CREATE TABLE IF NOT EXISTS story_assignees (
    story_id TEXT NOT NULL REFERENCES stories(id) ON DELETE CASCADE,
    member_id TEXT NOT NULL,
    member_type TEXT NOT NULL CHECK (member_type IN ('human', 'agent')),
    name TEXT NOT NULL,
    color TEXT NOT NULL,
    avatar TEXT,
    assigned_at TEXT NOT NULL,
    PRIMARY KEY (story_id, member_id)
);

CREATE TABLE IF NOT EXISTS events (
    id TEXT PRIMARY KEY,
    event_type TEXT NOT NULL,
    actor_type TEXT NOT NULL CHECK (actor_type IN ('user', 'agent')),
    actor_id TEXT NOT NULL,
    target_type TEXT NOT NULL,
    target_id TEXT NOT NULL,
    project_id TEXT NOT NULL,
    payload JSON NOT NULL DEFAULT '{}',
    timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_stories_project ON stories(project_id);
CREATE INDEX IF NOT EXISTS idx_criteria_story ON acceptance_criteria(story_id);
CREATE INDEX IF NOT EXISTS idx_runs_story ON agent_runs(story_id);
CREATE INDEX IF NOT EXISTS idx_progress_run ON progress_entries(run_id);
CREATE INDEX IF NOT EXISTS idx_members_project ON team_members(project_id);
CREATE INDEX IF NOT EXISTS idx_events_project ON events(project_id);

-- Only one running agent per story at a time
CREATE UNIQUE INDEX IF NOT EXISTS idx_one_running_agent
    ON agent_runs(story_id) WHERE status = 'running';
"#;
