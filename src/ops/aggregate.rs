use indexmap::IndexMap;
use serde::Serialize;

use crate::model::project::Project;
use crate::model::task::{Cost, Task};
use crate::model::user::User;

/// Counts for one bucket of tasks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub tasks: usize,
    pub completed: usize,
    pub cost: Cost,
}

impl Totals {
    pub fn of(tasks: &[Task]) -> Totals {
        Totals {
            tasks: tasks.len(),
            completed: tasks.iter().filter(|t| t.completed).count(),
            cost: tasks.iter().filter_map(|t| t.cost).sum(),
        }
    }
}

/// Every project's tasks merged into one view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllProjects {
    pub title: String,
    /// One bucket per known user, in user-list order, even when empty
    pub grouped_tasks: IndexMap<String, Vec<Task>>,
    pub unassigned_tasks: Vec<Task>,
    pub total_cost: Cost,
    pub assignee_totals: IndexMap<String, Totals>,
    pub unassigned_totals: Totals,
}

impl AllProjects {
    pub const TITLE: &'static str = "All Projects";
}

/// Merge every project's buckets by alias and concatenate the unassigned
/// tasks, in project order.
pub fn aggregate(projects: &[Project], users: &[User]) -> AllProjects {
    let mut grouped: IndexMap<String, Vec<Task>> = users
        .iter()
        .map(|u| (u.alias.clone(), Vec::new()))
        .collect();
    let mut unassigned = Vec::new();

    for project in projects {
        for (alias, tasks) in &project.grouped_tasks {
            grouped
                .entry(alias.clone())
                .or_default()
                .extend(tasks.iter().cloned());
        }
        unassigned.extend(project.unassigned_tasks.iter().cloned());
    }

    let assignee_totals = grouped
        .iter()
        .map(|(alias, tasks)| (alias.clone(), Totals::of(tasks)))
        .collect();
    let unassigned_totals = Totals::of(&unassigned);

    AllProjects {
        title: AllProjects::TITLE.to_string(),
        grouped_tasks: grouped,
        unassigned_tasks: unassigned,
        total_cost: projects.iter().map(|p| p.total_cost).sum(),
        assignee_totals,
        unassigned_totals,
    }
}
