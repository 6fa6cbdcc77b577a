use chrono::NaiveDate;

use crate::model::document::Document;
use crate::model::project::Project;
use crate::model::task::{Task, TaskUpdate};
use crate::parse::tokens::{TaskTokens, render_tokens, render_update_tokens};

/// Render a task marker line: `- [x] text (@a) ($c) +d !d ~d`
pub fn serialize_task_line(task: &Task) -> String {
    let tokens = TaskTokens {
        assignee: task.assignee_alias.clone(),
        cost: task.cost,
        creation_date: task.creation_date,
        due_date: task.due_date,
        completion_date: task.completion_date,
    };
    task_line(task.completed, &task.text, &tokens)
}

/// Render a task marker line from its parts
pub fn task_line(completed: bool, text: &str, tokens: &TaskTokens) -> String {
    let mark = if completed { 'x' } else { ' ' };
    format!("- [{}] {}", mark, render_tokens(text, tokens))
}

/// Render an update line: `  - YYYY-MM-DD: text (@alias)`
pub fn serialize_update(update: &TaskUpdate) -> String {
    update_line(
        update.date,
        &update.text,
        update.assignee_alias.as_deref(),
    )
}

/// Render an update line from its parts. Newlines in `text` are folded into
/// spaces so an update always stays on one line.
pub fn update_line(date: NaiveDate, text: &str, alias: Option<&str>) -> String {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    format!(
        "  - {}: {}",
        date.format("%Y-%m-%d"),
        render_update_tokens(&text, alias)
    )
}

/// Render a task and its updates in canonical form, one update per line.
pub fn serialize_task(task: &Task) -> Vec<String> {
    let mut lines = vec![serialize_task_line(task)];
    lines.extend(task.updates.iter().map(serialize_update));
    lines
}

/// Re-render every task and update line of `doc` from the parsed model,
/// in place. All other lines, including blank lines inside update runs, are
/// kept verbatim, so no line moves.
pub fn serialize_projects(doc: &Document, projects: &[Project]) -> Document {
    let mut lines = doc.lines().to_vec();
    for task in projects.iter().flat_map(|p| p.tasks.iter()) {
        if let Some(line) = lines.get_mut(task.line_index) {
            *line = serialize_task_line(task);
        }
        for update in &task.updates {
            if let Some(line) = lines.get_mut(update.line_index) {
                *line = serialize_update(update);
            }
        }
    }
    doc.with_lines(lines)
}
