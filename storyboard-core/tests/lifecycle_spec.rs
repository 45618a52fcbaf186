use speculate2::speculate;

speculate! {
    use storyboard_core::db::Database;
    use storyboard_core::error::StoreError;
    use storyboard_core::models::*;
    use uuid::Uuid;

    fn setup_db() -> Database {
        let db = Database::open_memory().expect("Failed to create test database");
        db.migrate().expect("Failed to migrate test database");
        db
    }

    fn create_test_project(db: &Database) -> Project {
        db.create_project(CreateProjectInput {
            name: "checkout".to_string(),
            goal: "Ship the checkout flow".to_string(),
            tech_stack: vec!["rust".to_string()],
        })
        .expect("Failed to create project")
    }

    fn create_test_story(db: &Database, project_id: Uuid, criteria: &[&str]) -> StoryWithCriteria {
        db.create_story(CreateStoryInput {
            project_id,
            title: "Cart".to_string(),
            description: "Add items to the cart".to_string(),
            priority: 1,
            criteria: criteria.iter().map(|s| s.to_string()).collect(),
        })
        .expect("Failed to create story")
    }

    fn create_test_member(db: &Database, project_id: Uuid, name: &str) -> TeamMember {
        db.create_member(project_id, CreateMemberInput {
            name: name.to_string(),
            member_type: MemberType::Human,
            color: None,
            avatar: None,
        })
        .expect("Failed to create member")
    }

    describe "story creation" {
        it "starts in draft with unpassed criteria" {
            let db = setup_db();
            let project = create_test_project(&db);
            let created = create_test_story(&db, project.id, &["adds items", "shows total"]);

            assert_eq!(created.story.status, StoryStatus::Draft);
            assert_eq!(created.criteria.len(), 2);
            assert!(created.criteria.iter().all(|c| !c.passed));
        }

        it "rejects an unknown project id" {
            let db = setup_db();
            let err = db.create_story(CreateStoryInput {
                project_id: Uuid::new_v4(),
                title: "orphan".to_string(),
                description: String::new(),
                priority: 1,
                criteria: vec![],
            }).unwrap_err();

            assert!(matches!(err, StoreError::ProjectNotFound));
        }
    }

    describe "approval" {
        it "moves draft to approved and records the approver" {
            let db = setup_db();
            let project = create_test_project(&db);
            let story = create_test_story(&db, project.id, &[]).story;

            let approved = db.approve_story(story.id, "alice").unwrap();
            assert_eq!(approved.status, StoryStatus::Approved);
            assert_eq!(approved.approved_by, vec!["alice".to_string()]);
        }

        it "rejects any source status other than draft" {
            let db = setup_db();
            let project = create_test_project(&db);
            let story = create_test_story(&db, project.id, &[]).story;
            db.approve_story(story.id, "alice").unwrap();

            let err = db.approve_story(story.id, "bob").unwrap_err();
            assert!(matches!(err, StoreError::InvalidTransition { from: StoryStatus::Approved }));
        }
    }

    describe "field updates" {
        it "merges only the provided fields" {
            let db = setup_db();
            let project = create_test_project(&db);
            let story = create_test_story(&db, project.id, &[]).story;

            let updated = db.update_story(story.id, UpdateStoryInput {
                priority: Some(5),
                ..Default::default()
            }).unwrap();

            assert_eq!(updated.priority, 5);
            assert_eq!(updated.title, story.title);
            assert_eq!(updated.status, StoryStatus::Draft);
        }

        it "allows a direct status write as a manual override" {
            let db = setup_db();
            let project = create_test_project(&db);
            let story = create_test_story(&db, project.id, &[]).story;

            let updated = db.update_story(story.id, UpdateStoryInput {
                status: Some(StoryStatus::Blocked),
                ..Default::default()
            }).unwrap();

            assert_eq!(updated.status, StoryStatus::Blocked);
        }
    }

    describe "criteria auto-transition" {
        it "passes the story when the last criterion passes, and reverts on uncheck" {
            let db = setup_db();
            let project = create_test_project(&db);
            let created = create_test_story(&db, project.id, &["A", "B"]);
            let a = created.criteria[0].id;
            let b = created.criteria[1].id;

            db.update_criterion(a, UpdateCriterionInput {
                passed: Some(true),
                ..Default::default()
            }).unwrap();
            assert_eq!(db.get_story(created.story.id).unwrap().unwrap().status, StoryStatus::Draft);

            db.update_criterion(b, UpdateCriterionInput {
                passed: Some(true),
                ..Default::default()
            }).unwrap();
            assert_eq!(db.get_story(created.story.id).unwrap().unwrap().status, StoryStatus::Passed);

            db.update_criterion(b, UpdateCriterionInput {
                passed: Some(false),
                ..Default::default()
            }).unwrap();
            assert_eq!(db.get_story(created.story.id).unwrap().unwrap().status, StoryStatus::InProgress);
        }

        it "does not revert a story that is not passed when a criterion is unchecked" {
            let db = setup_db();
            let project = create_test_project(&db);
            let created = create_test_story(&db, project.id, &["A"]);

            db.update_criterion(created.criteria[0].id, UpdateCriterionInput {
                passed: Some(false),
                ..Default::default()
            }).unwrap();

            assert_eq!(db.get_story(created.story.id).unwrap().unwrap().status, StoryStatus::Draft);
        }

        it "does not re-evaluate on writes that leave passed untouched" {
            let db = setup_db();
            let project = create_test_project(&db);
            let created = create_test_story(&db, project.id, &["A"]);
            db.update_criterion(created.criteria[0].id, UpdateCriterionInput {
                passed: Some(true),
                ..Default::default()
            }).unwrap();
            assert_eq!(db.get_story(created.story.id).unwrap().unwrap().status, StoryStatus::Passed);

            // Evidence-only write keeps the story where it is
            db.update_criterion(created.criteria[0].id, UpdateCriterionInput {
                evidence: Some("screenshot attached".to_string()),
                ..Default::default()
            }).unwrap();
            assert_eq!(db.get_story(created.story.id).unwrap().unwrap().status, StoryStatus::Passed);
        }

        it "requires at least one criterion before a new criterion can complete a story" {
            let db = setup_db();
            let project = create_test_project(&db);
            let created = create_test_story(&db, project.id, &[]);

            // A story created without criteria stays in draft; the first
            // criterion added later must itself pass before the story does.
            let criterion = db.add_criterion(created.story.id, CreateCriterionInput {
                description: "works end to end".to_string(),
            }).unwrap();
            assert_eq!(db.get_story(created.story.id).unwrap().unwrap().status, StoryStatus::Draft);

            db.update_criterion(criterion.id, UpdateCriterionInput {
                passed: Some(true),
                ..Default::default()
            }).unwrap();
            assert_eq!(db.get_story(created.story.id).unwrap().unwrap().status, StoryStatus::Passed);
        }
    }

    describe "assignment" {
        it "copies the member snapshot onto the story once" {
            let db = setup_db();
            let project = create_test_project(&db);
            let story = create_test_story(&db, project.id, &[]).story;
            let member = create_test_member(&db, project.id, "Ada");

            let assigned = db.assign_member(story.id, member.id).unwrap();
            assert_eq!(assigned.assignees.len(), 1);
            assert_eq!(assigned.assignees[0].member_id, member.id);

            let err = db.assign_member(story.id, member.id).unwrap_err();
            assert!(matches!(err, StoreError::AlreadyAssigned));
            assert_eq!(db.get_story(story.id).unwrap().unwrap().assignees.len(), 1);
        }

        it "treats unassigning a non-assigned member as a no-op" {
            let db = setup_db();
            let project = create_test_project(&db);
            let story = create_test_story(&db, project.id, &[]).story;
            let member = create_test_member(&db, project.id, "Ada");

            let story = db.unassign_member(story.id, member.id).unwrap();
            assert!(story.assignees.is_empty());
        }

        it "keeps the snapshot after the member is deleted" {
            let db = setup_db();
            let project = create_test_project(&db);
            let story = create_test_story(&db, project.id, &[]).story;
            let member = create_test_member(&db, project.id, "Ada");
            db.assign_member(story.id, member.id).unwrap();

            db.delete_member(member.id).unwrap();

            let story = db.get_story(story.id).unwrap().unwrap();
            assert_eq!(story.assignees.len(), 1);
            assert_eq!(story.assignees[0].name, "Ada");
        }
    }

    describe "agent runs" {
        it "starting a run occupies the story and moves it to in_progress" {
            let db = setup_db();
            let project = create_test_project(&db);
            let story = create_test_story(&db, project.id, &[]).story;

            let run = db.start_run(StartRunInput {
                story_id: story.id,
                agent_type: None,
                max_iterations: None,
            }).unwrap();

            assert_eq!(run.status, RunStatus::Running);
            assert_eq!(run.agent_type, AgentType::Ralph);
            assert_eq!(run.iteration, 0);

            let story = db.get_story(story.id).unwrap().unwrap();
            assert_eq!(story.status, StoryStatus::InProgress);
            assert_eq!(story.assigned_agent, Some(run.id));
        }

        it "allows at most one running run per story and reports the existing id" {
            let db = setup_db();
            let project = create_test_project(&db);
            let story = create_test_story(&db, project.id, &[]).story;
            let first = db.start_run(StartRunInput {
                story_id: story.id,
                agent_type: None,
                max_iterations: None,
            }).unwrap();

            let err = db.start_run(StartRunInput {
                story_id: story.id,
                agent_type: Some(AgentType::Reviewer),
                max_iterations: None,
            }).unwrap_err();

            match err {
                StoreError::RunAlreadyActive { run_id } => assert_eq!(run_id, first.id),
                other => panic!("Expected RunAlreadyActive, got {other:?}"),
            }
        }

        it "rejects a start against a missing story" {
            let db = setup_db();
            let err = db.start_run(StartRunInput {
                story_id: Uuid::new_v4(),
                agent_type: None,
                max_iterations: None,
            }).unwrap_err();
            assert!(matches!(err, StoreError::StoryNotFound));
        }

        it "records progress and never regresses the iteration counter" {
            let db = setup_db();
            let project = create_test_project(&db);
            let story = create_test_story(&db, project.id, &[]).story;
            let run = db.start_run(StartRunInput {
                story_id: story.id,
                agent_type: None,
                max_iterations: None,
            }).unwrap();

            db.record_progress(RecordProgressInput {
                run_id: run.id,
                iteration: 3,
                action: "implemented cart".to_string(),
                files_changed: vec!["src/cart.rs".to_string()],
                commit_sha: Some("abc123".to_string()),
            }).unwrap();

            // Stale report: entry is appended, counter stays at 3
            db.record_progress(RecordProgressInput {
                run_id: run.id,
                iteration: 1,
                action: "late report".to_string(),
                files_changed: vec![],
                commit_sha: None,
            }).unwrap();

            let run = db.get_run_with_progress(run.id).unwrap().unwrap();
            assert_eq!(run.run.iteration, 3);
            assert_eq!(run.progress.len(), 2);
            assert_eq!(run.progress[1].iteration, 1);
        }

        it "rejects progress against a run that is not running" {
            let db = setup_db();
            let project = create_test_project(&db);
            let story = create_test_story(&db, project.id, &[]).story;
            let run = db.start_run(StartRunInput {
                story_id: story.id,
                agent_type: None,
                max_iterations: None,
            }).unwrap();
            db.complete_run(CompleteRunInput {
                run_id: run.id,
                exit_signal: ExitSignal::Complete,
            }).unwrap();

            let err = db.record_progress(RecordProgressInput {
                run_id: run.id,
                iteration: 4,
                action: "too late".to_string(),
                files_changed: vec![],
                commit_sha: None,
            }).unwrap_err();
            assert!(matches!(err, StoreError::RunNotActive));
        }

        it "COMPLETE passes the story and releases it" {
            let db = setup_db();
            let project = create_test_project(&db);
            let story = create_test_story(&db, project.id, &[]).story;
            let run = db.start_run(StartRunInput {
                story_id: story.id,
                agent_type: None,
                max_iterations: None,
            }).unwrap();

            let run = db.complete_run(CompleteRunInput {
                run_id: run.id,
                exit_signal: ExitSignal::Complete,
            }).unwrap();

            assert_eq!(run.status, RunStatus::Complete);
            assert_eq!(run.exit_signal, Some(ExitSignal::Complete));
            assert!(run.ended_at.is_some());

            let story = db.get_story(story.id).unwrap().unwrap();
            assert_eq!(story.status, StoryStatus::Passed);
            assert_eq!(story.assigned_agent, None);
        }

        it "BLOCKED blocks the story, and a new run returns it to in_progress" {
            let db = setup_db();
            let project = create_test_project(&db);
            let story = create_test_story(&db, project.id, &[]).story;
            let run = db.start_run(StartRunInput {
                story_id: story.id,
                agent_type: None,
                max_iterations: None,
            }).unwrap();

            db.complete_run(CompleteRunInput {
                run_id: run.id,
                exit_signal: ExitSignal::Blocked,
            }).unwrap();
            assert_eq!(db.get_story(story.id).unwrap().unwrap().status, StoryStatus::Blocked);

            db.start_run(StartRunInput {
                story_id: story.id,
                agent_type: None,
                max_iterations: None,
            }).unwrap();
            assert_eq!(db.get_story(story.id).unwrap().unwrap().status, StoryStatus::InProgress);
        }

        it "lists only running runs for a project" {
            let db = setup_db();
            let project = create_test_project(&db);
            let story = create_test_story(&db, project.id, &[]).story;
            let other = create_test_story(&db, project.id, &[]).story;

            let done = db.start_run(StartRunInput {
                story_id: story.id,
                agent_type: None,
                max_iterations: None,
            }).unwrap();
            db.complete_run(CompleteRunInput {
                run_id: done.id,
                exit_signal: ExitSignal::Complete,
            }).unwrap();
            let live = db.start_run(StartRunInput {
                story_id: other.id,
                agent_type: Some(AgentType::Writer),
                max_iterations: Some(5),
            }).unwrap();

            let running = db.running_runs_for_project(project.id).unwrap();
            assert_eq!(running.len(), 1);
            assert_eq!(running[0].id, live.id);
        }
    }

    describe "event log" {
        it "appends events in mutation order" {
            let db = setup_db();
            let project = create_test_project(&db);
            let created = create_test_story(&db, project.id, &["A"]);
            db.update_criterion(created.criteria[0].id, UpdateCriterionInput {
                passed: Some(true),
                ..Default::default()
            }).unwrap();

            let events = db.events_by_project(project.id).unwrap();
            let types: Vec<_> = events.iter().map(|e| e.event_type).collect();
            assert_eq!(types, vec![
                EventType::ProjectCreated,
                EventType::StoryCreated,
                EventType::CriteriaPassed,
                EventType::StoryStatusChanged,
            ]);
        }
    }

    describe "persistence" {
        it "survives a close and reopen of a file-backed store" {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let path = dir.path().join("storyboard.db");

            {
                let db = Database::open(&path).unwrap();
                db.migrate().unwrap();
                create_test_project(&db);
            }

            let db = Database::open(&path).unwrap();
            db.migrate().unwrap();
            assert_eq!(db.list_projects().unwrap().len(), 1);
        }
    }
}
