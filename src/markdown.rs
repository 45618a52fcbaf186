//! PRD Markdown rendering.

use storyboard_core::models::{Project, StoryStatus, StoryWithCriteria};

/// Render a project and its stories as a PRD document. Stories are ordered
/// by ascending priority; each criterion becomes a task-list item.
pub fn render_prd(project: &Project, stories: &[StoryWithCriteria]) -> String {
    let mut ordered: Vec<&StoryWithCriteria> = stories.iter().collect();
    ordered.sort_by_key(|s| s.story.priority);

    let mut md = format!("# {}\n\n", project.name);
    md.push_str(&format!("**Goal:** {}\n\n", project.goal));
    md.push_str(&format!(
        "**Tech Stack:** {}\n\n",
        project.tech_stack.join(", ")
    ));
    md.push_str("---\n\n");
    md.push_str("## Stories\n\n");

    for entry in ordered {
        let story = &entry.story;
        md.push_str(&format!(
            "### {} Story {}: {}\n\n",
            status_emoji(story.status),
            story.priority,
            story.title
        ));
        md.push_str(&format!("{}\n\n", story.description));
        md.push_str(&format!("**Status:** {}\n\n", story.status));
        md.push_str("**Acceptance Criteria:**\n");
        for criterion in &entry.criteria {
            let check = if criterion.passed { "[x]" } else { "[ ]" };
            md.push_str(&format!("- {} {}\n", check, criterion.description));
        }
        md.push('\n');
    }

    md
}

fn status_emoji(status: StoryStatus) -> &'static str {
    match status {
        StoryStatus::Draft => "📝",
        StoryStatus::Approved => "✅",
        StoryStatus::InProgress => "🔄",
        StoryStatus::Passed => "✓",
        StoryStatus::Blocked => "🚫",
    }
}
