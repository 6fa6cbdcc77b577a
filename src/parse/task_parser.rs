use crate::model::task::{Task, TaskUpdate};
use crate::parse::line::{LineKind, block_end};
use crate::parse::tokens::{extract_tokens, extract_update_tokens};

/// Parse the task whose marker line is `start_idx`, consuming its update
/// lines but never scanning past `last`.
/// Returns the task and the next line index to process.
pub fn parse_task(kinds: &[LineKind<'_>], start_idx: usize, last: usize) -> Option<(Task, usize)> {
    let LineKind::Task { completed, body } = kinds.get(start_idx)? else {
        return None;
    };

    let (text, tokens) = extract_tokens(body);
    let end = block_end(kinds, start_idx, last);

    let updates = (start_idx + 1..=end)
        .filter_map(|idx| parse_update(kinds, idx))
        .collect();

    let task = Task {
        line_index: start_idx,
        block_end_line: end,
        text,
        completed: *completed,
        assignee_alias: tokens.assignee,
        creation_date: tokens.creation_date,
        completion_date: tokens.completion_date,
        due_date: tokens.due_date,
        cost: tokens.cost,
        updates,
    };
    Some((task, end + 1))
}

/// Parse a single update line, if `idx` is one.
pub fn parse_update(kinds: &[LineKind<'_>], idx: usize) -> Option<TaskUpdate> {
    let LineKind::Update { date, body } = kinds.get(idx)? else {
        return None;
    };
    let (text, assignee_alias) = extract_update_tokens(body);
    Some(TaskUpdate {
        line_index: idx,
        date: *date,
        text,
        assignee_alias,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::Cost;
    use crate::parse::line::{classify_all, parse_iso_date};

    fn lines(s: &str) -> Vec<String> {
        s.lines().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_parse_minimal_task() {
        let input = lines("- [ ] Fix parser crash on empty blocks");
        let kinds = classify_all(&input);
        let (task, next) = parse_task(&kinds, 0, 0).unwrap();
        assert!(!task.completed);
        assert_eq!(task.text, "Fix parser crash on empty blocks");
        assert_eq!(task.assignee_alias, None);
        assert_eq!(task.block_end_line, 0);
        assert_eq!(next, 1);
    }

    #[test]
    fn test_parse_task_with_updates() {
        let input = lines(
            "- [x] Sign contract (@ann) ($150.25) ~2024-03-02\n\
             \x20\x20- 2024-02-20: Sent draft\n\
             \n\
             \x20\x20- 2024-03-01: Legal approved (@bob)\n\
             \n\
             Trailing paragraph",
        );
        let kinds = classify_all(&input);
        let (task, next) = parse_task(&kinds, 0, input.len() - 1).unwrap();
        assert!(task.completed);
        assert_eq!(task.text, "Sign contract");
        assert_eq!(task.assignee_alias.as_deref(), Some("ann"));
        assert_eq!(task.cost, Some(Cost::from_cents(15_025)));
        assert_eq!(task.completion_date, parse_iso_date("2024-03-02"));
        assert_eq!(task.updates.len(), 2);
        assert_eq!(task.updates[0].line_index, 1);
        assert_eq!(task.updates[0].assignee_alias, None);
        assert_eq!(task.updates[1].line_index, 3);
        assert_eq!(task.updates[1].text, "Legal approved");
        assert_eq!(task.updates[1].assignee_alias.as_deref(), Some("bob"));
        assert_eq!(task.block_end_line, 3);
        assert_eq!(next, 4);
    }

    #[test]
    fn test_update_run_ends_at_malformed_line() {
        let input = lines(
            "- [ ] Task\n\
             \x20\x20- 2024-02-20: ok\n\
             \x20\x20- later: not an update\n\
             \x20\x20- 2024-02-21: orphan",
        );
        let kinds = classify_all(&input);
        let (task, next) = parse_task(&kinds, 0, 3).unwrap();
        assert_eq!(task.updates.len(), 1);
        assert_eq!(task.block_end_line, 1);
        assert_eq!(next, 2);
    }

    #[test]
    fn test_not_a_task_line() {
        let input = lines("Just text");
        let kinds = classify_all(&input);
        assert!(parse_task(&kinds, 0, 0).is_none());
        assert!(parse_task(&kinds, 5, 5).is_none());
    }
}
