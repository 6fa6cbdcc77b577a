use serde::Serialize;

use crate::model::project::{Heading, Project};
use crate::model::task::{Cost, Task, TaskUpdate};
use crate::model::user::User;
use crate::ops::aggregate::{AllProjects, Totals};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTasksJson<'a> {
    pub title: &'a str,
    pub start_line: usize,
    pub end_line: usize,
    pub tasks: Vec<&'a Task>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadingJson<'a> {
    pub project: &'a str,
    #[serde(flatten)]
    pub heading: &'a Heading,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssigneeSummaryJson<'a> {
    pub alias: &'a str,
    pub name: &'a str,
    #[serde(flatten)]
    pub totals: Totals,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryJson<'a> {
    pub assignees: Vec<AssigneeSummaryJson<'a>>,
    pub unassigned: Totals,
    pub total_cost: Cost,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeJson<'a> {
    pub op: &'a str,
    pub changed: bool,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn summary_to_json<'a>(all: &AllProjects, users: &'a [User]) -> SummaryJson<'a> {
    let assignees = users
        .iter()
        .map(|u| AssigneeSummaryJson {
            alias: &u.alias,
            name: u.display_name(),
            totals: all.assignee_totals.get(&u.alias).copied().unwrap_or_default(),
        })
        .collect();
    SummaryJson {
        assignees,
        unassigned: all.unassigned_totals,
        total_cost: all.total_cost,
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// Which tasks `pd list` shows
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// `Some(None)` selects unassigned tasks
    pub assignee: Option<Option<String>>,
    pub completed: Option<bool>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(completed) = self.completed
            && task.completed != completed
        {
            return false;
        }
        match &self.assignee {
            Some(alias) => task.assignee_alias == *alias,
            None => true,
        }
    }
}

/// One task as a single line: `  12  [x] text @alias $cost +created !due ~done`
pub fn format_task_line(task: &Task) -> String {
    let mark = if task.completed { 'x' } else { ' ' };
    let mut out = format!("{:>4}  [{}] {}", task.line_index, mark, task.text);
    if let Some(alias) = &task.assignee_alias {
        out.push_str(&format!(" @{}", alias));
    }
    if let Some(cost) = task.cost {
        out.push_str(&format!(" ${}", cost));
    }
    for (sigil, date) in [
        ('+', task.creation_date),
        ('!', task.due_date),
        ('~', task.completion_date),
    ] {
        if let Some(date) = date {
            out.push_str(&format!(" {}{}", sigil, date));
        }
    }
    out
}

pub fn format_update_line(update: &TaskUpdate) -> String {
    let mut out = format!("{:>4}        {}: {}", update.line_index, update.date, update.text);
    if let Some(alias) = &update.assignee_alias {
        out.push_str(&format!(" @{}", alias));
    }
    out
}

/// A project header followed by its matching tasks and their updates
pub fn format_project_listing(project: &Project, filter: &TaskFilter) -> Vec<String> {
    let mut lines = vec![format!("== {} ==", project.title)];
    for task in project.tasks.iter().filter(|t| filter.matches(t)) {
        lines.push(format_task_line(task));
        lines.extend(task.updates.iter().map(format_update_line));
    }
    lines
}

/// `   4  ## Design  (design)`, indented by level
pub fn format_heading(heading: &Heading) -> String {
    let indent = "  ".repeat(usize::from(heading.level.saturating_sub(1)));
    format!(
        "{:>4}  {}{} {}  ({})",
        heading.line,
        indent,
        "#".repeat(usize::from(heading.level)),
        heading.text,
        heading.slug
    )
}

/// Per-assignee table, then unassigned and total rows
pub fn format_summary(all: &AllProjects, users: &[User]) -> Vec<String> {
    let mut rows: Vec<(String, Totals)> = users
        .iter()
        .map(|u| {
            let totals = all.assignee_totals.get(&u.alias).copied().unwrap_or_default();
            (format!("@{}", u.alias), totals)
        })
        .collect();
    rows.push(("unassigned".to_string(), all.unassigned_totals));

    let name_w = rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0).max(8);
    let mut lines = vec![format!("{:<name_w$}  {:>5}  {:>5}  {:>10}", "assignee", "tasks", "done", "cost")];
    for (name, totals) in &rows {
        lines.push(format!(
            "{:<name_w$}  {:>5}  {:>5}  {:>10}",
            name,
            totals.tasks,
            totals.completed,
            format!("${}", totals.cost)
        ));
    }
    lines.push(format!(
        "{:<name_w$}  {:>5}  {:>5}  {:>10}",
        "total",
        "",
        "",
        format!("${}", all.total_cost)
    ));
    lines
}

pub fn format_user(user: &User) -> String {
    let mut out = format!("@{}  {}", user.alias, user.display_name());
    if !user.emails.is_empty() {
        out.push_str(&format!("  <{}>", user.emails.join(", ")));
    }
    out
}
