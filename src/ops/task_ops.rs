use chrono::{Local, NaiveDate};

use crate::model::document::Document;
use crate::model::task::{Cost, DateKind};
use crate::model::user::sanitize_alias;
use crate::parse::line::{LineKind, block_end, classify, classify_all};
use crate::parse::task_serializer::update_line;
use crate::parse::tokens::{TokenKind, extract_update_tokens, set_token, strip_tokens};

/// Today's date in local time
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

// ---------------------------------------------------------------------------
// Task line rewrites
// ---------------------------------------------------------------------------

/// Edit the body of the task line at `line` as text, keeping everything
/// the edit does not touch as written. Anything that is not a task line is
/// left alone.
fn rewrite_task_line(
    doc: &Document,
    line: usize,
    op: &str,
    edit: impl FnOnce(bool, &str) -> (bool, String),
) -> Document {
    let Some(LineKind::Task { completed, body }) = doc.line(line).map(classify) else {
        tracing::debug!(line, op, "not a task line, skipping");
        return doc.clone();
    };
    let (completed, body) = edit(completed, body);
    let mark = if completed { 'x' } else { ' ' };
    doc.with_line(line, format!("- [{}] {}", mark, body))
        .unwrap_or_else(|| doc.clone())
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Set the checkbox. Completing stamps `~today` (replacing any older
/// completion date); un-completing removes it.
pub fn toggle_completion(doc: &Document, line: usize, completed: bool, today: NaiveDate) -> Document {
    rewrite_task_line(doc, line, "toggle", |_, body| {
        let body = strip_tokens(body, TokenKind::Completion);
        let body = if completed {
            set_token(&body, TokenKind::Completion, Some(&iso(today)))
        } else {
            body
        };
        (completed, body)
    })
}

/// Replace or remove the `(@alias)` token
pub fn set_assignee(doc: &Document, line: usize, alias: Option<&str>) -> Document {
    let alias = alias.map(sanitize_alias).filter(|a| !a.is_empty());
    rewrite_task_line(doc, line, "assign", |completed, body| {
        (completed, set_token(body, TokenKind::Assignee, alias.as_deref()))
    })
}

/// Replace or remove one of the three date tokens
pub fn set_date(doc: &Document, line: usize, kind: DateKind, date: Option<NaiveDate>) -> Document {
    let value = date.map(iso);
    rewrite_task_line(doc, line, "date", |completed, body| {
        (completed, set_token(body, kind.into(), value.as_deref()))
    })
}

/// Replace or remove the `($amount)` token
pub fn set_cost(doc: &Document, line: usize, cost: Option<Cost>) -> Document {
    let value = cost.map(|c| c.to_string());
    rewrite_task_line(doc, line, "cost", |completed, body| {
        (completed, set_token(body, TokenKind::Cost, value.as_deref()))
    })
}

// ---------------------------------------------------------------------------
// Block edits
// ---------------------------------------------------------------------------

/// Split free-form content into document lines. Empty content is no lines.
pub fn content_lines(content: &str) -> Vec<String> {
    if content.is_empty() {
        return Vec::new();
    }
    let body = content.strip_suffix('\n').unwrap_or(content);
    body.split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
        .collect()
}

/// Replace `count` lines from `start` with `content`.
///
/// Used for free-form edits of a whole task block. Empty content deletes
/// the block. A range that does not fit the document is a no-op.
pub fn edit_block(doc: &Document, start: usize, count: usize, content: &str) -> Document {
    match doc.splice(start, count, content_lines(content)) {
        Some(edited) => edited,
        None => {
            tracing::debug!(start, count, len = doc.len(), "block out of range, skipping");
            doc.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Updates
// ---------------------------------------------------------------------------

/// A replacement for an existing update line. `date: None` keeps the old
/// date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEdit {
    pub date: Option<NaiveDate>,
    pub text: String,
    pub assignee_alias: Option<String>,
}

/// Insert `  - today: text (@alias)` after the last update of the task at
/// `task_line`.
pub fn add_update(
    doc: &Document,
    task_line: usize,
    text: &str,
    alias: Option<&str>,
    today: NaiveDate,
) -> Document {
    if text.trim().is_empty() {
        tracing::debug!(task_line, "empty update text, skipping");
        return doc.clone();
    }
    let kinds = classify_all(doc.lines());
    if !matches!(kinds.get(task_line), Some(LineKind::Task { .. })) {
        tracing::debug!(task_line, "not a task line, skipping update");
        return doc.clone();
    }
    let end = block_end(&kinds, task_line, doc.len() - 1);
    let alias = alias.map(sanitize_alias).filter(|a| !a.is_empty());
    let new_line = update_line(today, text, alias.as_deref());
    doc.splice(end + 1, 0, vec![new_line])
        .unwrap_or_else(|| doc.clone())
}

/// Add the same update to several tasks. Lines are handled from the bottom
/// up so each insertion leaves the remaining indexes valid.
pub fn add_bulk_updates(
    doc: &Document,
    task_lines: &[usize],
    text: &str,
    alias: Option<&str>,
    today: NaiveDate,
) -> Document {
    let mut lines = task_lines.to_vec();
    lines.sort_unstable_by(|a, b| b.cmp(a));
    lines.dedup();
    lines
        .into_iter()
        .fold(doc.clone(), |acc, line| add_update(&acc, line, text, alias, today))
}

/// Rewrite the update line at `line`, or delete it when `edit` is `None`.
pub fn update_or_delete_update(doc: &Document, line: usize, edit: Option<&UpdateEdit>) -> Document {
    let Some(LineKind::Update { date, body }) = doc.line(line).map(classify) else {
        tracing::debug!(line, "not an update line, skipping");
        return doc.clone();
    };
    let replacement = match edit {
        None => Vec::new(),
        Some(edit) => {
            let text = if edit.text.trim().is_empty() {
                extract_update_tokens(body).0
            } else {
                edit.text.clone()
            };
            let alias = edit
                .assignee_alias
                .as_deref()
                .map(sanitize_alias)
                .filter(|a| !a.is_empty());
            vec![update_line(edit.date.unwrap_or(date), &text, alias.as_deref())]
        }
    };
    doc.splice(line, 1, replacement).unwrap_or_else(|| doc.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::project_parser::parse_document;
    use pretty_assertions::assert_eq;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn doc(text: &str) -> Document {
        Document::from(text)
    }

    #[test]
    fn test_unassign_then_complete() {
        let d = doc("# P\n- [ ] Ship release (@bob) ($2000) +2024-01-01 !2024-02-01\n");
        let d = set_assignee(&d, 1, None);
        assert_eq!(d.line(1), Some("- [ ] Ship release ($2000) +2024-01-01 !2024-02-01"));
        let d = toggle_completion(&d, 1, true, date("2024-02-10"));
        assert_eq!(
            d.line(1),
            Some("- [x] Ship release ($2000) +2024-01-01 !2024-02-01 ~2024-02-10")
        );
    }

    #[test]
    fn test_toggle_symmetry() {
        let original = doc("- [ ] Task (@ann) ($5)");
        let done = toggle_completion(&original, 0, true, date("2024-03-01"));
        assert_eq!(done.line(0), Some("- [x] Task (@ann) ($5) ~2024-03-01"));
        let undone = toggle_completion(&done, 0, false, date("2024-03-02"));
        assert_eq!(undone, original);
    }

    #[test]
    fn test_complete_replaces_old_completion_date() {
        let d = doc("- [x] Old ~2023-01-01");
        let d = toggle_completion(&d, 0, true, date("2024-01-01"));
        assert_eq!(d.line(0), Some("- [x] Old ~2024-01-01"));
    }

    #[test]
    fn test_assign_leaves_other_tokens_as_written() {
        let d = doc("- [x] Pay ~2024-01-03 ($10.5) +2024-01-01");
        let d = set_assignee(&d, 0, Some("Ann"));
        assert_eq!(d.line(0), Some("- [x] Pay (@ann) ~2024-01-03 ($10.5) +2024-01-01"));
        let d = set_assignee(&d, 0, Some("bob"));
        assert_eq!(d.line(0), Some("- [x] Pay (@bob) ~2024-01-03 ($10.5) +2024-01-01"));
    }

    #[test]
    fn test_toggle_keeps_token_in_mid_text() {
        let original = doc("- [ ] +2024-01-01 Call (@ann) the vendor");
        let done = toggle_completion(&original, 0, true, date("2024-02-10"));
        assert_eq!(
            done.line(0),
            Some("- [x] +2024-01-01 Call (@ann) the vendor ~2024-02-10")
        );
        assert_eq!(toggle_completion(&done, 0, false, date("2024-02-11")), original);
    }

    #[test]
    fn test_rewrites_keep_duplicate_tokens() {
        let d = doc("- [ ] Pair (@ann) (@bob)");
        let done = toggle_completion(&d, 0, true, date("2024-02-10"));
        assert_eq!(done.line(0), Some("- [x] Pair (@ann) (@bob) ~2024-02-10"));
        let dated = set_date(&d, 0, DateKind::Due, Some(date("2024-03-01")));
        assert_eq!(dated.line(0), Some("- [ ] Pair (@ann) (@bob) !2024-03-01"));
    }

    #[test]
    fn test_set_date_and_cost() {
        let d = doc("- [ ] Plan");
        let d = set_date(&d, 0, DateKind::Creation, Some(date("2024-01-01")));
        let d = set_date(&d, 0, DateKind::Due, Some(date("2024-02-01")));
        let d = set_cost(&d, 0, Cost::parse("99.99"));
        assert_eq!(d.line(0), Some("- [ ] Plan ($99.99) +2024-01-01 !2024-02-01"));
        let d = set_date(&d, 0, DateKind::Due, None);
        let d = set_cost(&d, 0, None);
        assert_eq!(d.line(0), Some("- [ ] Plan +2024-01-01"));
    }

    #[test]
    fn test_rewrites_ignore_non_task_lines() {
        let d = doc("# Heading\nplain");
        assert_eq!(toggle_completion(&d, 0, true, date("2024-01-01")), d);
        assert_eq!(set_assignee(&d, 1, Some("ann")), d);
        assert_eq!(set_cost(&d, 42, None), d);
    }

    #[test]
    fn test_edit_block_shifts_following_lines() {
        let d = doc("# P\n- [ ] a\n  - 2024-01-01: x\n- [ ] b\n## After\n");
        let before = parse_document(&d, &[]);
        let edited = edit_block(&d, 1, 2, "- [ ] a2\n  - 2024-01-01: x\n  - 2024-01-02: y\n  - 2024-01-03: z");
        let after = parse_document(&edited, &[]);
        assert_eq!(after[0].tasks[0].line_index, before[0].tasks[0].line_index);
        assert_eq!(after[0].tasks[1].line_index, before[0].tasks[1].line_index + 2);
        assert_eq!(after[0].headings[1].line, before[0].headings[1].line + 2);
    }

    #[test]
    fn test_edit_block_empty_content_deletes() {
        let d = doc("- [ ] a\n  - 2024-01-01: x\n- [ ] b\n");
        assert_eq!(edit_block(&d, 0, 2, "").to_string(), "- [ ] b\n");
        assert_eq!(edit_block(&d, 2, 5, "nope"), d);
    }

    #[test]
    fn test_add_update_after_last_update() {
        let d = doc("- [ ] a\n  - 2024-01-01: one\n\n  - 2024-01-02: two\n\nNext");
        let d = add_update(&d, 0, "three", Some("bob"), date("2024-01-03"));
        assert_eq!(
            d.to_string(),
            "- [ ] a\n  - 2024-01-01: one\n\n  - 2024-01-02: two\n  - 2024-01-03: three (@bob)\n\nNext"
        );
    }

    #[test]
    fn test_add_bulk_updates_descending() {
        let d = doc("- [ ] a\n- [ ] b\n  - 2024-01-01: old\n- [ ] c");
        let d = add_bulk_updates(&d, &[0, 3, 1, 0], "sync", None, date("2024-05-05"));
        assert_eq!(
            d.to_string(),
            "- [ ] a\n  - 2024-05-05: sync\n- [ ] b\n  - 2024-01-01: old\n  - 2024-05-05: sync\n- [ ] c\n  - 2024-05-05: sync"
        );
    }

    #[test]
    fn test_update_edit_and_delete() {
        let d = doc("- [ ] a\n  - 2024-01-01: one (@ann)\n  - 2024-01-02: two");
        let edit = UpdateEdit {
            date: None,
            text: "first".into(),
            assignee_alias: None,
        };
        let edited = update_or_delete_update(&d, 1, Some(&edit));
        assert_eq!(edited.line(1), Some("  - 2024-01-01: first"));
        let deleted = update_or_delete_update(&d, 2, None);
        assert_eq!(deleted.to_string(), "- [ ] a\n  - 2024-01-01: one (@ann)");
        assert_eq!(update_or_delete_update(&d, 0, None), d);
    }
}
