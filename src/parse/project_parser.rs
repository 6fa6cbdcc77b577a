use indexmap::IndexMap;

use crate::model::document::Document;
use crate::model::project::{Heading, Project};
use crate::model::task::{Cost, Task};
use crate::model::user::{User, find_user};
use crate::parse::line::{LineKind, classify_all};
use crate::parse::slug::SlugGenerator;
use crate::parse::task_parser::parse_task;

/// Deepest heading level tracked for navigation
const MAX_HEADING_LEVEL: usize = 3;

/// Parse raw text into projects. Total: any input yields a result.
pub fn parse(text: &str, users: &[User]) -> Vec<Project> {
    parse_document(&Document::from(text), users)
}

/// Parse a document into projects.
///
/// Each `# ` heading starts a project that runs to the line before the next
/// one. Lines above the first `# ` heading belong to the first project, so
/// projects always cover every line. With no `# ` heading at all the whole
/// document is a single untitled project.
pub fn parse_document(doc: &Document, users: &[User]) -> Vec<Project> {
    let lines = doc.lines();
    let kinds = classify_all(lines);
    let last_line = lines.len().saturating_sub(1);

    let h1_lines: Vec<usize> = kinds
        .iter()
        .enumerate()
        .filter(|(_, k)| matches!(k, LineKind::Heading { level: 1, .. }))
        .map(|(i, _)| i)
        .collect();

    let mut bounds = Vec::new();
    if h1_lines.is_empty() {
        bounds.push((Project::UNTITLED.to_string(), 0, last_line));
    } else {
        for (i, &line) in h1_lines.iter().enumerate() {
            let start = if i == 0 { 0 } else { line };
            let end = h1_lines.get(i + 1).map(|n| n - 1).unwrap_or(last_line);
            let title = match kinds[line] {
                LineKind::Heading { text, .. } => text.to_string(),
                _ => String::new(),
            };
            bounds.push((title, start, end));
        }
    }

    let mut slugs = SlugGenerator::new();
    let projects: Vec<Project> = bounds
        .into_iter()
        .map(|(title, start, end)| scan_project(&kinds, title, start, end, users, &mut slugs))
        .collect();

    tracing::debug!(
        projects = projects.len(),
        tasks = projects.iter().map(|p| p.tasks.len()).sum::<usize>(),
        "parsed document"
    );
    projects
}

/// Sequentially scan one project's line range.
fn scan_project(
    kinds: &[LineKind<'_>],
    title: String,
    start: usize,
    end: usize,
    users: &[User],
    slugs: &mut SlugGenerator,
) -> Project {
    let mut headings = Vec::new();
    let mut tasks = Vec::new();

    let mut idx = start;
    while idx <= end && idx < kinds.len() {
        match kinds[idx] {
            LineKind::Heading { level, text } if level <= MAX_HEADING_LEVEL => {
                headings.push(Heading {
                    level: level as u8,
                    text: text.to_string(),
                    slug: slugs.slug(text),
                    line: idx,
                });
                idx += 1;
            }
            LineKind::Task { .. } => match parse_task(kinds, idx, end) {
                Some((task, next_idx)) => {
                    tasks.push(task);
                    idx = next_idx;
                }
                None => idx += 1,
            },
            _ => idx += 1,
        }
    }

    let (grouped_tasks, unassigned_tasks) = partition_by_assignee(&tasks, users);
    let total_cost: Cost = tasks.iter().filter_map(|t| t.cost).sum();

    Project {
        title,
        start_line: start,
        end_line: end,
        headings,
        tasks,
        grouped_tasks,
        unassigned_tasks,
        total_cost,
    }
}

/// Bucket tasks by resolved assignee. Every known user gets a bucket, even
/// an empty one; aliases that match no user count as unassigned.
pub fn partition_by_assignee(
    tasks: &[Task],
    users: &[User],
) -> (IndexMap<String, Vec<Task>>, Vec<Task>) {
    let mut grouped: IndexMap<String, Vec<Task>> = users
        .iter()
        .map(|u| (u.alias.clone(), Vec::new()))
        .collect();
    let mut unassigned = Vec::new();

    for task in tasks {
        match task.assignee_alias.as_deref() {
            Some(alias) if find_user(users, alias).is_some() => {
                grouped.entry(alias.to_string()).or_default().push(task.clone());
            }
            _ => unassigned.push(task.clone()),
        }
    }
    (grouped, unassigned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Vec<User> {
        vec![User::new("ann", "Ann"), User::new("bob", "Bob")]
    }

    const PLAN: &str = "\
Preamble line

# Alpha

## Notes

- [ ] Draft budget (@ann) ($100)
  - 2024-01-02: First pass (@bob)
- [x] Book venue (@zed) ($50.50) ~2024-01-05

# Beta

## Notes

- [ ] Hire (@bob)
#### Too deep
";

    #[test]
    fn test_projects_cover_every_line() {
        let projects = parse(PLAN, &users());
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].title, "Alpha");
        assert_eq!(projects[0].start_line, 0);
        assert_eq!(projects[0].end_line, 9);
        assert_eq!(projects[1].title, "Beta");
        assert_eq!(projects[1].start_line, 10);
        assert_eq!(projects[1].end_line, 15);
    }

    #[test]
    fn test_headings_and_slugs() {
        let projects = parse(PLAN, &users());
        let slugs: Vec<&str> = projects
            .iter()
            .flat_map(|p| p.headings.iter().map(|h| h.slug.as_str()))
            .collect();
        assert_eq!(slugs, vec!["alpha", "notes", "beta", "notes-2"]);
        assert_eq!(projects[1].headings[1].line, 12);
        assert_eq!(projects[1].headings[1].level, 2);
    }

    #[test]
    fn test_grouping_and_cost() {
        let projects = parse(PLAN, &users());
        let alpha = &projects[0];
        assert_eq!(alpha.tasks.len(), 2);
        assert_eq!(alpha.grouped_tasks["ann"].len(), 1);
        assert!(alpha.grouped_tasks["bob"].is_empty());
        // unknown alias degrades to unassigned but stays in the model
        assert_eq!(alpha.unassigned_tasks.len(), 1);
        assert_eq!(alpha.unassigned_tasks[0].assignee_alias.as_deref(), Some("zed"));
        assert_eq!(alpha.total_cost, Cost::from_cents(15_050));
        assert_eq!(alpha.tasks[0].block_end_line, 7);
    }

    #[test]
    fn test_no_level_one_heading() {
        let projects = parse("## Loose\n- [ ] a\n- [ ] b", &[]);
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].title, Project::UNTITLED);
        assert_eq!(projects[0].start_line, 0);
        assert_eq!(projects[0].end_line, 2);
        assert_eq!(projects[0].tasks.len(), 2);
        assert_eq!(projects[0].unassigned_tasks.len(), 2);
    }

    #[test]
    fn test_empty_and_garbage_input() {
        let projects = parse("", &[]);
        assert_eq!(projects.len(), 1);
        assert!(projects[0].tasks.is_empty());

        let projects = parse("- [?] odd\n\u{0}\n  - 2024-01-01: orphan update\n####", &[]);
        assert_eq!(projects.len(), 1);
        assert!(projects[0].tasks.is_empty());
        assert!(projects[0].headings.is_empty());
    }

    #[test]
    fn test_entity_lines_within_project_bounds() {
        for project in parse(PLAN, &users()) {
            for h in &project.headings {
                assert!(project.contains_line(h.line));
            }
            for t in &project.tasks {
                assert!(project.start_line <= t.line_index);
                assert!(t.line_index <= t.block_end_line);
                assert!(t.block_end_line <= project.end_line);
            }
        }
    }
}
