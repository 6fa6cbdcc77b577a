use chrono::NaiveDate;

use crate::model::document::Documents;
use crate::model::task::{Cost, DateKind};
use crate::ops::archive;
use crate::ops::task_ops::{self, UpdateEdit};
use crate::ops::tree_ops::{self, MoveDirection};

/// Inputs an operation needs besides the documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpContext {
    pub today: NaiveDate,
    /// Write the `_Archived on:` marker when archiving a section
    pub archive_marker: bool,
}

impl OpContext {
    pub fn new(today: NaiveDate) -> Self {
        OpContext {
            today,
            archive_marker: true,
        }
    }

    /// Context for the current local date
    pub fn now() -> Self {
        OpContext::new(task_ops::today())
    }
}

/// A named edit of the live and archive documents.
///
/// Line numbers refer to the document the op targets (the archive for the
/// restore ops, the live document for everything else) as last parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    ToggleCompletion { line: usize, completed: bool },
    SetAssignee { line: usize, alias: Option<String> },
    SetDate { line: usize, kind: DateKind, date: Option<NaiveDate> },
    SetCost { line: usize, cost: Option<Cost> },
    EditBlock { start: usize, count: usize, content: String },
    AddUpdate { task_line: usize, text: String, alias: Option<String> },
    AddBulkUpdates { task_lines: Vec<usize>, text: String, alias: Option<String> },
    EditUpdate { line: usize, edit: UpdateEdit },
    DeleteUpdate { line: usize },
    ReorderTask { line: usize, direction: MoveDirection },
    MoveSection { heading_line: usize, dest_line: usize },
    DuplicateSection { heading_line: usize, dest_line: usize },
    AddTask { heading_line: Option<usize>, text: String, alias: Option<String> },
    DeleteTask { line: usize },
    ArchiveSection { heading_line: usize },
    RestoreSection { heading_line: usize },
    ArchiveTask { line: usize },
    RestoreTask { line: usize },
    ArchiveCompleted,
}

impl Op {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Op::ToggleCompletion { .. } => "toggle_completion",
            Op::SetAssignee { .. } => "set_assignee",
            Op::SetDate { .. } => "set_date",
            Op::SetCost { .. } => "set_cost",
            Op::EditBlock { .. } => "edit_block",
            Op::AddUpdate { .. } => "add_update",
            Op::AddBulkUpdates { .. } => "add_bulk_updates",
            Op::EditUpdate { .. } => "edit_update",
            Op::DeleteUpdate { .. } => "delete_update",
            Op::ReorderTask { .. } => "reorder_task",
            Op::MoveSection { .. } => "move_section",
            Op::DuplicateSection { .. } => "duplicate_section",
            Op::AddTask { .. } => "add_task",
            Op::DeleteTask { .. } => "delete_task",
            Op::ArchiveSection { .. } => "archive_section",
            Op::RestoreSection { .. } => "restore_section",
            Op::ArchiveTask { .. } => "archive_task",
            Op::RestoreTask { .. } => "restore_task",
            Op::ArchiveCompleted => "archive_completed",
        }
    }
}

/// Apply one operation. Pure: the inputs are never modified and an invalid
/// target returns the documents unchanged.
pub fn apply(docs: &Documents, op: &Op, ctx: &OpContext) -> Documents {
    let live = &docs.live;
    let with_live = |live| Documents {
        live,
        archive: docs.archive.clone(),
    };

    let out = match op {
        Op::ToggleCompletion { line, completed } => {
            with_live(task_ops::toggle_completion(live, *line, *completed, ctx.today))
        }
        Op::SetAssignee { line, alias } => {
            with_live(task_ops::set_assignee(live, *line, alias.as_deref()))
        }
        Op::SetDate { line, kind, date } => with_live(task_ops::set_date(live, *line, *kind, *date)),
        Op::SetCost { line, cost } => with_live(task_ops::set_cost(live, *line, *cost)),
        Op::EditBlock {
            start,
            count,
            content,
        } => with_live(task_ops::edit_block(live, *start, *count, content)),
        Op::AddUpdate {
            task_line,
            text,
            alias,
        } => with_live(task_ops::add_update(
            live,
            *task_line,
            text,
            alias.as_deref(),
            ctx.today,
        )),
        Op::AddBulkUpdates {
            task_lines,
            text,
            alias,
        } => with_live(task_ops::add_bulk_updates(
            live,
            task_lines,
            text,
            alias.as_deref(),
            ctx.today,
        )),
        Op::EditUpdate { line, edit } => {
            with_live(task_ops::update_or_delete_update(live, *line, Some(edit)))
        }
        Op::DeleteUpdate { line } => with_live(task_ops::update_or_delete_update(live, *line, None)),
        Op::ReorderTask { line, direction } => {
            with_live(tree_ops::reorder_task(live, *line, *direction))
        }
        Op::MoveSection {
            heading_line,
            dest_line,
        } => with_live(tree_ops::move_section(live, *heading_line, *dest_line)),
        Op::DuplicateSection {
            heading_line,
            dest_line,
        } => with_live(tree_ops::duplicate_section(live, *heading_line, *dest_line)),
        Op::AddTask {
            heading_line,
            text,
            alias,
        } => with_live(tree_ops::add_task(
            live,
            *heading_line,
            text,
            alias.as_deref(),
            ctx.today,
        )),
        Op::DeleteTask { line } => with_live(tree_ops::delete_task(live, *line)),
        Op::ArchiveSection { heading_line } => archive::archive_section(
            live,
            &docs.archive,
            *heading_line,
            ctx.today,
            ctx.archive_marker,
        ),
        Op::RestoreSection { heading_line } => {
            archive::restore_section(live, &docs.archive, *heading_line)
        }
        Op::ArchiveTask { line } => archive::archive_task(live, &docs.archive, *line),
        Op::RestoreTask { line } => archive::restore_task(live, &docs.archive, *line),
        Op::ArchiveCompleted => archive::archive_completed(live, &docs.archive),
    };

    if out == *docs {
        tracing::debug!(op = op.name(), "operation changed nothing");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::document::Document;

    fn ctx() -> OpContext {
        OpContext::new(NaiveDate::from_ymd_opt(2024, 2, 10).unwrap())
    }

    fn docs(live: &str) -> Documents {
        Documents {
            live: Document::from(live),
            archive: Document::default(),
        }
    }

    #[test]
    fn test_apply_is_pure() {
        let before = docs("# P\n- [ ] a\n");
        let after = apply(&before, &Op::ToggleCompletion { line: 1, completed: true }, &ctx());
        assert_eq!(before.live.to_string(), "# P\n- [ ] a\n");
        assert_eq!(after.live.to_string(), "# P\n- [x] a ~2024-02-10\n");
    }

    #[test]
    fn test_apply_archive_touches_both_documents() {
        let before = docs("# P\n## Done\n- [x] a\n");
        let after = apply(&before, &Op::ArchiveCompleted, &ctx());
        assert_eq!(after.live.to_string(), "# P\n## Done\n");
        assert_eq!(after.archive.to_string(), "# P\n\n## Done\n- [x] a\n");
    }

    #[test]
    fn test_apply_invalid_target_is_noop() {
        let before = docs("# P\n");
        for op in [
            Op::DeleteTask { line: 9 },
            Op::SetCost { line: 0, cost: None },
            Op::RestoreSection { heading_line: 0 },
            Op::EditBlock {
                start: 4,
                count: 1,
                content: String::new(),
            },
        ] {
            assert_eq!(apply(&before, &op, &ctx()), before, "op: {}", op.name());
        }
    }
}
