use chrono::NaiveDate;

use crate::model::document::Document;
use crate::model::outline::{Node, NodePath, Outline, PathSegment, Section, TaskItem, TaskList};
use crate::model::user::sanitize_alias;
use crate::parse::outline_parser::parse_outline;
use crate::parse::outline_serializer::serialize_outline;
use crate::parse::task_serializer::task_line;
use crate::parse::tokens::extract_tokens;

/// Where `reorder_task` moves a task within its list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
    Top,
    Bottom,
}

// ---------------------------------------------------------------------------
// Blank line handling
// ---------------------------------------------------------------------------

fn is_blank_line(line: &str) -> bool {
    line.trim().is_empty()
}

/// Drop blank lines from the start of a node sequence
pub fn trim_head(nodes: &mut Vec<Node>) {
    while let Some(first) = nodes.first_mut() {
        let Node::Literal { lines, .. } = first else {
            return;
        };
        let blanks = lines.iter().take_while(|l| is_blank_line(l)).count();
        lines.drain(..blanks);
        if !lines.is_empty() {
            return;
        }
        nodes.remove(0);
    }
}

/// Drop blank lines from the end of a node sequence, looking inside a
/// trailing section
pub fn trim_tail(nodes: &mut Vec<Node>) {
    while let Some(last) = nodes.last_mut() {
        match last {
            Node::Literal { lines, .. } => {
                while lines.last().is_some_and(|l| is_blank_line(l)) {
                    lines.pop();
                }
                if !lines.is_empty() {
                    return;
                }
                nodes.pop();
            }
            Node::Section(section) => {
                trim_tail(&mut section.children);
                return;
            }
            Node::Tasks(_) => return,
        }
    }
}

/// Position for appending at `idx` so new content lands above any blank
/// lines that end the preceding literal. Splits that literal if needed.
pub fn settle_before(children: &mut Vec<Node>, idx: usize) -> usize {
    let Some(prev) = idx.checked_sub(1) else {
        return idx;
    };
    let Some(Node::Literal {
        lines,
        source_lines,
    }) = children.get_mut(prev)
    else {
        return idx;
    };
    let blanks = lines.iter().rev().take_while(|l| is_blank_line(l)).count();
    if blanks == 0 {
        return idx;
    }
    if blanks == lines.len() {
        return settle_before(children, prev);
    }
    let split = lines.len() - blanks;
    let tail = lines.split_off(split);
    let tail_range = source_lines.as_mut().map(|r| {
        let tail_range = r.start + split..r.end;
        r.end = r.start + split;
        tail_range
    });
    children.insert(
        idx,
        Node::Literal {
            lines: tail,
            source_lines: tail_range,
        },
    );
    idx
}

/// Insert `block` at `idx`, keeping one blank line between it and any
/// non-blank neighbour. Content placed directly under a heading is not
/// separated from it; a sub-heading is.
///
/// Returns the index of the first inserted node.
pub fn place(children: &mut Vec<Node>, idx: usize, mut block: Vec<Node>, in_section: bool) -> usize {
    trim_head(&mut block);
    trim_tail(&mut block);
    let idx = idx.min(children.len());
    if block.is_empty() {
        return idx;
    }

    let starts_with_heading = matches!(block.first(), Some(Node::Section(_)));
    let blank_before = match idx.checked_sub(1) {
        Some(prev) => children[prev].last_line().is_some_and(|l| !is_blank_line(l)),
        None => in_section && starts_with_heading,
    };
    let blank_after = children
        .get(idx)
        .and_then(Node::first_line)
        .is_some_and(|l| !is_blank_line(l));

    let mut at = idx;
    if blank_before {
        children.insert(at, Node::blank());
        at += 1;
    }
    let count = block.len();
    children.splice(at..at, block);
    if blank_after {
        children.insert(at + count, Node::blank());
    }
    at
}

/// Split the literal at `idx` so that `line` starts a new literal
fn split_literal(children: &mut Vec<Node>, idx: usize, line: usize) {
    let Some(Node::Literal {
        lines,
        source_lines: Some(range),
    }) = children.get_mut(idx)
    else {
        return;
    };
    let k = line.saturating_sub(range.start).min(lines.len());
    let tail = lines.split_off(k);
    let tail_range = line..range.end;
    range.end = line;
    children.insert(
        idx + 1,
        Node::Literal {
            lines: tail,
            source_lines: Some(tail_range),
        },
    );
}

/// Split the task list at `idx` before the first item starting at or after
/// `line`. Returns where new content should go.
fn split_tasks(children: &mut Vec<Node>, idx: usize, line: usize) -> usize {
    let Some(Node::Tasks(list)) = children.get_mut(idx) else {
        return idx + 1;
    };
    let Some(k) = list
        .items
        .iter()
        .position(|item| item.source_lines.as_ref().is_some_and(|r| r.start >= line))
    else {
        return idx + 1;
    };
    if k == 0 {
        return idx;
    }

    let tail_items = list.items.split_off(k);
    let tail_gaps = list.gaps.split_off(k);
    let middle = list.gaps.pop().unwrap_or_default();
    let head_end = list.items.last().and_then(|i| i.source_lines.as_ref()).map(|r| r.end);
    let tail_start = tail_items.first().and_then(|i| i.source_lines.as_ref()).map(|r| r.start);
    let tail_range = match (tail_start, list.source_lines.as_ref()) {
        (Some(start), Some(range)) => Some(start..range.end),
        _ => None,
    };
    if let (Some(end), Some(range)) = (head_end, list.source_lines.as_mut()) {
        range.end = end;
    }

    let tail = TaskList {
        items: tail_items,
        gaps: tail_gaps,
        source_lines: tail_range,
    };
    children.insert(idx + 1, Node::Tasks(tail));
    if !middle.is_empty() {
        children.insert(idx + 1, Node::literal(middle));
    }
    idx + 1
}

/// Insert `block` so that it starts where source line `line` was.
/// A line past the end appends to `children`.
pub fn insert_at_line(children: &mut Vec<Node>, line: usize, block: Vec<Node>, in_section: bool) {
    let mut i = 0;
    while i < children.len() {
        let Some(range) = children[i].source_lines().cloned() else {
            i += 1;
            continue;
        };
        if line <= range.start {
            place(children, i, block, in_section);
            return;
        }
        if range.contains(&line) {
            if let Node::Section(section) = &mut children[i] {
                insert_at_line(&mut section.children, line, block, true);
                return;
            }
            let at = if matches!(children[i], Node::Literal { .. }) {
                split_literal(children, i, line);
                i + 1
            } else {
                split_tasks(children, i, line)
            };
            place(children, at, block, in_section);
            return;
        }
        i += 1;
    }
    let end = settle_before(children, children.len());
    place(children, end, block, in_section);
}

// ---------------------------------------------------------------------------
// Path resolution and merging
// ---------------------------------------------------------------------------

/// Walk `segments` from the root, creating any missing heading at the end
/// of its parent. Each level only looks at the direct child sections of the
/// level above, so a heading under an unrelated parent never matches.
///
/// Returns the path of the last section (empty for an empty path).
pub fn ensure_path(outline: &mut Outline, segments: &[PathSegment]) -> NodePath {
    let mut path: NodePath = Vec::new();
    for segment in segments {
        let in_section = !path.is_empty();
        let Some(children) = outline.children_at_mut(&path) else {
            break;
        };
        let found = children
            .iter()
            .position(|n| matches!(n, Node::Section(s) if s.matches(segment)));
        let idx = match found {
            Some(idx) => idx,
            None => {
                tracing::debug!(heading = %segment.heading_line(), "creating heading");
                let end = settle_before(children, children.len());
                place(
                    children,
                    end,
                    vec![Node::Section(Section::new(segment))],
                    in_section,
                )
            }
        };
        path.push(idx);
    }
    path
}

/// Merge `incoming` into a section body (or the root).
///
/// Content before the first sub-section goes to the end of the direct body;
/// a lone task list joins the last existing list there. Incoming
/// sub-sections merge into same-named children, or are appended.
pub fn merge_into(children: &mut Vec<Node>, in_section: bool, incoming: Vec<Node>) {
    let mut body = incoming;
    let first_section = body
        .iter()
        .position(|n| matches!(n, Node::Section(_)))
        .unwrap_or(body.len());
    let subsections = body.split_off(first_section);
    trim_head(&mut body);
    trim_tail(&mut body);

    if !body.is_empty() {
        let body_end = children
            .iter()
            .position(|n| matches!(n, Node::Section(_)))
            .unwrap_or(children.len());
        let reuse = match body.as_slice() {
            [Node::Tasks(_)] => children[..body_end]
                .iter()
                .rposition(|n| matches!(n, Node::Tasks(_))),
            _ => None,
        };
        match (reuse, body.pop()) {
            (Some(i), Some(Node::Tasks(list))) => {
                if let Node::Tasks(target) = &mut children[i] {
                    target.append(list);
                }
            }
            (_, Some(last)) => {
                body.push(last);
                let at = settle_before(children, body_end);
                place(children, at, body, in_section);
            }
            (_, None) => {}
        }
    }

    for node in subsections {
        let Node::Section(sub) = node else {
            continue;
        };
        let existing = children
            .iter()
            .position(|n| matches!(n, Node::Section(s) if s.matches(&sub.segment())));
        match existing {
            Some(i) => {
                if let Node::Section(target) = &mut children[i] {
                    merge_into(&mut target.children, true, sub.children);
                }
            }
            None => {
                let end = settle_before(children, children.len());
                place(children, end, vec![Node::Section(sub)], in_section);
            }
        }
    }
}

/// Number of lines before the node at `path`
pub fn line_offset(outline: &Outline, path: &[usize]) -> usize {
    let mut offset = 0;
    let mut children = &outline.children;
    for (depth, &i) in path.iter().enumerate() {
        offset += children[..i.min(children.len())]
            .iter()
            .map(Node::line_count)
            .sum::<usize>();
        match children.get(i) {
            Some(Node::Section(section)) if depth + 1 < path.len() => {
                offset += 1;
                children = &section.children;
            }
            _ => break,
        }
    }
    offset
}

// ---------------------------------------------------------------------------
// Structural operations
// ---------------------------------------------------------------------------

fn finish(outline: &Outline, was_empty: bool) -> Document {
    let mut outline = outline.clone();
    if was_empty && !outline.children.is_empty() {
        outline.trailing_newline = true;
    }
    serialize_outline(&outline)
}

/// Move a task block among the siblings of its own list
pub fn reorder_task(doc: &Document, line: usize, direction: MoveDirection) -> Document {
    let mut outline = parse_outline(doc);
    let Some((path, k)) = outline.find_task(line) else {
        tracing::debug!(line, "no task at line, skipping reorder");
        return doc.clone();
    };
    let Some(Node::Tasks(list)) = outline.node_at_mut(&path) else {
        return doc.clone();
    };
    let last = list.items.len() - 1;
    match direction {
        MoveDirection::Up if k > 0 => list.items.swap(k, k - 1),
        MoveDirection::Down if k < last => list.items.swap(k, k + 1),
        MoveDirection::Top if k > 0 => {
            let item = list.items.remove(k);
            list.items.insert(0, item);
        }
        MoveDirection::Bottom if k < last => {
            let item = list.items.remove(k);
            list.items.push(item);
        }
        _ => {
            tracing::debug!(line, ?direction, "task already at edge");
            return doc.clone();
        }
    }
    serialize_outline(&outline)
}

/// Relocate the section whose heading is on `heading_line` so that it
/// starts where `dest_line` was. A destination inside the section itself
/// is a no-op.
pub fn move_section(doc: &Document, heading_line: usize, dest_line: usize) -> Document {
    relocate_section(doc, heading_line, dest_line, false)
}

/// Copy the section whose heading is on `heading_line` to `dest_line`
pub fn duplicate_section(doc: &Document, heading_line: usize, dest_line: usize) -> Document {
    relocate_section(doc, heading_line, dest_line, true)
}

fn relocate_section(doc: &Document, heading_line: usize, dest_line: usize, copy: bool) -> Document {
    let mut outline = parse_outline(doc);
    let Some(path) = outline.find_section(heading_line) else {
        tracing::debug!(heading_line, "no section at line");
        return doc.clone();
    };
    let Some(range) = outline.node_at(&path).and_then(Node::source_lines).cloned() else {
        return doc.clone();
    };
    if dest_line > range.start && dest_line < range.end {
        tracing::debug!(heading_line, dest_line, "destination inside section");
        return doc.clone();
    }
    if !copy && (dest_line == range.start || dest_line == range.end) {
        return doc.clone();
    }

    let node = if copy {
        outline.node_at(&path).cloned()
    } else {
        outline.detach(&path)
    };
    let Some(mut node) = node else {
        return doc.clone();
    };
    node.forget_source();
    insert_at_line(&mut outline.children, dest_line, vec![node], false);
    serialize_outline(&outline)
}

/// Append a new open task to the direct list of the section whose heading
/// is on `heading_line`, or to the top of the document when `None`.
/// The task is stamped `+today` unless the text already carries a creation
/// date.
pub fn add_task(
    doc: &Document,
    heading_line: Option<usize>,
    text: &str,
    alias: Option<&str>,
    today: NaiveDate,
) -> Document {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let (clean, mut tokens) = extract_tokens(&text);
    if clean.is_empty() {
        tracing::debug!("empty task text, skipping");
        return doc.clone();
    }
    if let Some(alias) = alias.map(sanitize_alias).filter(|a| !a.is_empty()) {
        tokens.assignee = Some(alias);
    }
    tokens.creation_date = tokens.creation_date.or(Some(today));
    let item = TaskItem::new(vec![task_line(false, &clean, &tokens)]);

    let mut outline = parse_outline(doc);
    let path = match heading_line {
        Some(line) => match outline.find_section(line) {
            Some(path) => path,
            None => {
                tracing::debug!(line, "no section at line, skipping add");
                return doc.clone();
            }
        },
        None => Vec::new(),
    };
    let in_section = !path.is_empty();
    let Some(children) = outline.children_at_mut(&path) else {
        return doc.clone();
    };
    merge_into(children, in_section, vec![Node::Tasks(TaskList::new(vec![item]))]);
    finish(&outline, doc.is_empty())
}

/// Remove a task and its updates
pub fn delete_task(doc: &Document, line: usize) -> Document {
    let mut outline = parse_outline(doc);
    match take_task(&mut outline, line) {
        Some(_) => serialize_outline(&outline),
        None => {
            tracing::debug!(line, "no task at line, skipping delete");
            doc.clone()
        }
    }
}

/// Detach the task whose marker is on `line`, with the headings above it.
/// An emptied list is removed from the tree.
pub fn take_task(outline: &mut Outline, line: usize) -> Option<(Vec<PathSegment>, TaskItem)> {
    let (path, k) = outline.find_task(line)?;
    let segments = outline.heading_path(&path);
    let Some(Node::Tasks(list)) = outline.node_at_mut(&path) else {
        return None;
    };
    let mut item = list.remove(k)?;
    item.source_lines = None;
    if list.items.is_empty() {
        outline.detach(&path);
    }
    Some((segments, item))
}
