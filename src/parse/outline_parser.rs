use crate::model::document::Document;
use crate::model::outline::{Node, Outline, Section, TaskItem, TaskList};
use crate::parse::line::{LineKind, block_end, classify_all};

/// Build the section tree of a document.
///
/// Headings of every depth nest by level. Task blocks separated only by blank
/// lines form one list. Everything else is kept as literal lines, so
/// flattening the tree gives back the input unchanged.
pub fn parse_outline(doc: &Document) -> Outline {
    let lines = doc.lines();
    let kinds = classify_all(lines);
    let mut root: Vec<Node> = Vec::new();
    let mut stack: Vec<Section> = Vec::new();

    let mut idx = 0;
    while idx < lines.len() {
        match kinds[idx] {
            LineKind::Heading { level, text } => {
                close_sections(&mut stack, &mut root, level);
                stack.push(Section {
                    level,
                    title: text.to_string(),
                    heading: lines[idx].clone(),
                    children: Vec::new(),
                    source_lines: Some(idx..idx + 1),
                });
                idx += 1;
            }
            LineKind::Task { .. } => {
                let (list, next) = parse_task_list(lines, &kinds, idx);
                current(&mut stack, &mut root).push(Node::Tasks(list));
                idx = next;
            }
            _ => {
                push_literal(current(&mut stack, &mut root), idx, &lines[idx]);
                idx += 1;
            }
        }
    }
    close_sections(&mut stack, &mut root, 0);

    Outline {
        children: root,
        trailing_newline: doc.trailing_newline(),
    }
}

fn current<'a>(stack: &'a mut [Section], root: &'a mut Vec<Node>) -> &'a mut Vec<Node> {
    match stack.last_mut() {
        Some(section) => &mut section.children,
        None => root,
    }
}

/// Pop every open section at `level` or deeper into its parent.
/// Level 0 closes everything.
fn close_sections(stack: &mut Vec<Section>, root: &mut Vec<Node>, level: usize) {
    while stack.last().is_some_and(|s| s.level >= level) {
        let Some(mut section) = stack.pop() else {
            break;
        };
        if let Some(range) = section.source_lines.as_mut() {
            let end = section
                .children
                .last()
                .and_then(Node::source_lines)
                .map(|r| r.end)
                .unwrap_or(range.end);
            range.end = end.max(range.end);
        }
        current(stack, root).push(Node::Section(section));
    }
}

fn push_literal(children: &mut Vec<Node>, idx: usize, line: &str) {
    if let Some(Node::Literal {
        lines,
        source_lines: Some(range),
    }) = children.last_mut()
        && range.end == idx
    {
        lines.push(line.to_string());
        range.end = idx + 1;
        return;
    }
    children.push(Node::Literal {
        lines: vec![line.to_string()],
        source_lines: Some(idx..idx + 1),
    });
}

/// Collect the run of task blocks starting at `start`.
/// Returns the list and the first line after it.
fn parse_task_list(lines: &[String], kinds: &[LineKind<'_>], start: usize) -> (TaskList, usize) {
    let last = lines.len().saturating_sub(1);
    let mut items = Vec::new();
    let mut gaps = Vec::new();

    let mut idx = start;
    loop {
        let end = block_end(kinds, idx, last);
        items.push(TaskItem {
            lines: lines[idx..=end].to_vec(),
            source_lines: Some(idx..end + 1),
        });

        let mut next = end + 1;
        while next < lines.len() && kinds[next].is_blank() {
            next += 1;
        }
        if next < lines.len() && matches!(kinds[next], LineKind::Task { .. }) {
            gaps.push(lines[end + 1..next].to_vec());
            idx = next;
        } else {
            let list = TaskList {
                items,
                gaps,
                source_lines: Some(start..end + 1),
            };
            return (list, end + 1);
        }
    }
}
