use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::task::{Cost, Task};

/// A level 1-3 heading, used for navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Heading {
    pub level: u8,
    pub text: String,
    /// Anchor id, unique within one parse of the document
    pub slug: String,
    pub line: usize,
}

/// A top-level section of the document, started by a `# ` heading.
///
/// When the document has no level-1 heading, the whole document is one
/// untitled project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub title: String,
    pub start_line: usize,
    /// Inclusive
    pub end_line: usize,
    pub headings: Vec<Heading>,
    /// Every task in document order
    pub tasks: Vec<Task>,
    /// Tasks whose alias resolves to a known user, bucketed by alias
    pub grouped_tasks: IndexMap<String, Vec<Task>>,
    /// Tasks with no alias or an alias no user has
    pub unassigned_tasks: Vec<Task>,
    pub total_cost: Cost,
}

impl Project {
    /// Title used for a document without any level-1 heading
    pub const UNTITLED: &'static str = "Untitled";

    pub fn contains_line(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    /// Find the task whose block covers `line`
    pub fn task_at(&self, line: usize) -> Option<&Task> {
        self.tasks
            .iter()
            .find(|t| t.line_index <= line && line <= t.block_end_line)
    }
}
