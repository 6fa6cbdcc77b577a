use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::model::document::{Document, Documents};
use crate::model::outline::{Node, Outline, PathSegment, TaskItem, TaskList};
use crate::parse::outline_parser::parse_outline;
use crate::parse::outline_serializer::serialize_outline;
use crate::ops::tree_ops::{ensure_path, line_offset, merge_into, take_task, trim_head};

static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^_Archived on: \d{4}-\d{2}-\d{2}_$").expect("valid regex"));

/// The line written above an archived section's content
pub fn archive_marker(date: NaiveDate) -> String {
    format!("_Archived on: {}_", date.format("%Y-%m-%d"))
}

pub fn is_archive_marker(line: &str) -> bool {
    MARKER_RE.is_match(line.trim())
}

// ---------------------------------------------------------------------------
// Hierarchy resolver
// ---------------------------------------------------------------------------

/// Find the section at `path` in `doc`, creating any missing headings.
///
/// Returns the updated document and the line where content for that
/// section should be inserted: after its direct body, above its first
/// sub-section and above any blank lines that close the body. An empty path
/// resolves to the end of the top-level content.
pub fn find_or_create_path(doc: &Document, path: &[PathSegment]) -> (Document, usize) {
    let mut outline = parse_outline(doc);
    let node_path = ensure_path(&mut outline, path);
    if doc.is_empty() && !outline.children.is_empty() {
        outline.trailing_newline = true;
    }

    let (start, children) = match outline.node_at(&node_path) {
        Some(Node::Section(section)) => (line_offset(&outline, &node_path) + 1, &section.children),
        _ => (0, &outline.children),
    };
    let body: Vec<&Node> = children
        .iter()
        .take_while(|n| !matches!(n, Node::Section(_)))
        .collect();
    let mut body_lines: usize = body.iter().map(|n| n.line_count()).sum();
    for node in body.iter().rev() {
        match node {
            Node::Literal { lines, .. } => {
                let blanks = lines.iter().rev().take_while(|l| l.trim().is_empty()).count();
                body_lines -= blanks;
                if blanks < lines.len() {
                    break;
                }
            }
            _ => break,
        }
    }
    (serialize_outline(&outline), start + body_lines)
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Move the section whose heading is on `heading_line` from `live` into
/// `archive`, under the same chain of headings. With `marker` set, an
/// `_Archived on: YYYY-MM-DD_` line is written above its content.
pub fn archive_section(
    live: &Document,
    archive: &Document,
    heading_line: usize,
    today: NaiveDate,
    marker: bool,
) -> Documents {
    let prefix = if marker {
        vec![Node::literal(vec![archive_marker(today), String::new()])]
    } else {
        Vec::new()
    };
    relocate_section(live, archive, heading_line, Some(prefix)).unwrap_or_else(|| {
        tracing::debug!(heading_line, "no section to archive");
        Documents {
            live: live.clone(),
            archive: archive.clone(),
        }
    })
}

/// Move the section whose heading is on `heading_line` of `archive` back
/// into `live`, dropping archive markers from its content. Headings left
/// empty in the archive are removed.
pub fn restore_section(live: &Document, archive: &Document, heading_line: usize) -> Documents {
    match relocate_section(archive, live, heading_line, None) {
        Some(moved) => Documents {
            live: moved.archive,
            archive: moved.live,
        },
        None => {
            tracing::debug!(heading_line, "no archived section to restore");
            Documents {
                live: live.clone(),
                archive: archive.clone(),
            }
        }
    }
}

/// Detach a section from `from` and merge it into `to` at the same path.
/// `prefix` is placed above the section's own content. Without one this is
/// a restore: marker lines are stripped and emptied headings in `from` are
/// pruned.
fn relocate_section(
    from: &Document,
    to: &Document,
    heading_line: usize,
    prefix: Option<Vec<Node>>,
) -> Option<Documents> {
    let mut source = parse_outline(from);
    let path = source.find_section(heading_line)?;
    let segments = source.heading_path(&path);
    let Some(Node::Section(section)) = source.detach(&path) else {
        return None;
    };
    if prefix.is_none() {
        prune_empty_sections(&mut source, &path[..path.len() - 1]);
    }

    let mut body = section.children;
    body.iter_mut().for_each(Node::forget_source);
    match prefix {
        Some(mut prefix) => {
            trim_head(&mut body);
            prefix.extend(body);
            body = prefix;
        }
        None => {
            strip_markers(&mut body);
            trim_head(&mut body);
        }
    }

    let mut target = parse_outline(to);
    let target_path = ensure_path(&mut target, &segments);
    let children = target.children_at_mut(&target_path)?;
    merge_into(children, !target_path.is_empty(), body);
    if to.is_empty() {
        target.trailing_newline = true;
    }

    tracing::info!(
        heading = %segments.last().map(|s| s.text.as_str()).unwrap_or_default(),
        "relocated section"
    );
    Some(Documents {
        live: serialize_outline(&source),
        archive: serialize_outline(&target),
    })
}

/// Remove archive marker lines from a section body and from every
/// sub-section in it. Returns whether a marker sat directly in `body`.
fn strip_markers(body: &mut Vec<Node>) -> bool {
    let mut removed = false;
    for node in body.iter_mut() {
        match node {
            Node::Literal { lines, .. } => {
                let before = lines.len();
                lines.retain(|l| !is_archive_marker(l));
                removed |= lines.len() != before;
            }
            Node::Section(section) => {
                if strip_markers(&mut section.children) {
                    trim_head(&mut section.children);
                }
            }
            Node::Tasks(_) => {}
        }
    }
    body.retain(|n| !matches!(n, Node::Literal { lines, .. } if lines.is_empty()));
    removed
}

/// Walk up from the section at `path`, removing every section that no
/// longer holds anything but blank lines.
fn prune_empty_sections(outline: &mut Outline, path: &[usize]) {
    for depth in (1..=path.len()).rev() {
        let prefix = &path[..depth];
        let empty = match outline.node_at(prefix) {
            Some(Node::Section(section)) => section.children.iter().all(Node::is_blank),
            _ => false,
        };
        if !empty {
            return;
        }
        outline.detach(prefix);
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Move one task block from `live` into `archive` under the same headings
pub fn archive_task(live: &Document, archive: &Document, line: usize) -> Documents {
    match relocate_task(live, archive, line) {
        Some((live, archive)) => Documents { live, archive },
        None => {
            tracing::debug!(line, "no task to archive");
            Documents {
                live: live.clone(),
                archive: archive.clone(),
            }
        }
    }
}

/// Move one archived task block back into `live`
pub fn restore_task(live: &Document, archive: &Document, line: usize) -> Documents {
    match relocate_task(archive, live, line) {
        Some((archive, live)) => Documents { live, archive },
        None => {
            tracing::debug!(line, "no archived task to restore");
            Documents {
                live: live.clone(),
                archive: archive.clone(),
            }
        }
    }
}

fn relocate_task(from: &Document, to: &Document, line: usize) -> Option<(Document, Document)> {
    let mut source = parse_outline(from);
    let (segments, item) = take_task(&mut source, line)?;
    let mut target = parse_outline(to);
    deposit(&mut target, &segments, vec![item]);
    if to.is_empty() {
        target.trailing_newline = true;
    }
    Some((serialize_outline(&source), serialize_outline(&target)))
}

/// Move every completed task of `live` into `archive`, keeping document
/// order within each heading path.
pub fn archive_completed(live: &Document, archive: &Document) -> Documents {
    let mut source = parse_outline(live);
    let mut taken: Vec<(Vec<PathSegment>, Vec<TaskItem>)> = Vec::new();
    take_completed(&mut source.children, &mut Vec::new(), &mut taken);
    if taken.is_empty() {
        tracing::debug!("no completed tasks to archive");
        return Documents {
            live: live.clone(),
            archive: archive.clone(),
        };
    }

    let mut target = parse_outline(archive);
    let count: usize = taken.iter().map(|(_, items)| items.len()).sum();
    for (segments, items) in taken {
        deposit(&mut target, &segments, items);
    }
    if archive.is_empty() {
        target.trailing_newline = true;
    }
    tracing::info!(count, "archived completed tasks");
    Documents {
        live: serialize_outline(&source),
        archive: serialize_outline(&target),
    }
}

fn take_completed(
    children: &mut Vec<Node>,
    segments: &mut Vec<PathSegment>,
    taken: &mut Vec<(Vec<PathSegment>, Vec<TaskItem>)>,
) {
    for node in children.iter_mut() {
        match node {
            Node::Tasks(list) => {
                let mut done = Vec::new();
                let mut k = 0;
                while k < list.items.len() {
                    if list.items[k].is_completed() {
                        if let Some(mut item) = list.remove(k) {
                            item.source_lines = None;
                            done.push(item);
                        }
                    } else {
                        k += 1;
                    }
                }
                if !done.is_empty() {
                    match taken.last_mut() {
                        Some((path, items)) if path == segments => items.extend(done),
                        _ => taken.push((segments.clone(), done)),
                    }
                }
            }
            Node::Section(section) => {
                segments.push(section.segment());
                take_completed(&mut section.children, segments, taken);
                segments.pop();
            }
            Node::Literal { .. } => {}
        }
    }
    children.retain(|n| !matches!(n, Node::Tasks(list) if list.items.is_empty()));
}

fn deposit(target: &mut Outline, segments: &[PathSegment], items: Vec<TaskItem>) {
    let path = ensure_path(target, segments);
    if let Some(children) = target.children_at_mut(&path) {
        merge_into(children, !path.is_empty(), vec![Node::Tasks(TaskList::new(items))]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn doc(text: &str) -> Document {
        Document::from(text)
    }

    const LIVE: &str = "\
# Alpha

## Done
- [x] a ~2024-04-01
- [x] b

## Todo
- [ ] c
";

    #[test]
    fn test_archive_section_into_empty_archive() {
        let out = archive_section(&doc(LIVE), &Document::default(), 2, date("2024-05-01"), true);
        assert_eq!(out.live.to_string(), "# Alpha\n\n## Todo\n- [ ] c\n");
        assert_eq!(
            out.archive.to_string(),
            "# Alpha\n\n## Done\n_Archived on: 2024-05-01_\n\n- [x] a ~2024-04-01\n- [x] b\n"
        );
    }

    #[test]
    fn test_archive_then_restore_round_trip() {
        let archived = archive_section(&doc(LIVE), &Document::default(), 2, date("2024-05-01"), true);
        let restored = restore_section(&archived.live, &archived.archive, 2);
        assert_eq!(
            restored.live.to_string(),
            "# Alpha\n\n## Todo\n- [ ] c\n\n## Done\n- [x] a ~2024-04-01\n- [x] b\n"
        );
        assert_eq!(restored.archive.to_string(), "");
    }

    #[test]
    fn test_archive_merges_into_existing_path() {
        let archive = doc("# Alpha\n\n## Done\n_Archived on: 2024-01-01_\n\n- [x] old\n\n# Beta\n");
        let out = archive_section(&doc(LIVE), &archive, 2, date("2024-05-01"), false);
        assert_eq!(
            out.archive.to_string(),
            "# Alpha\n\n## Done\n_Archived on: 2024-01-01_\n\n- [x] old\n- [x] a ~2024-04-01\n- [x] b\n\n# Beta\n"
        );
    }

    #[test]
    fn test_archive_without_marker_keeps_parent_heading() {
        let live = doc("# Alpha\n\n## Done\n- [x] a\n");
        let out = archive_section(&live, &Document::default(), 2, date("2024-05-01"), false);
        assert!(out.live.to_string().starts_with("# Alpha\n"));
        assert_eq!(out.archive.to_string(), "# Alpha\n\n## Done\n- [x] a\n");
    }

    #[test]
    fn test_restore_strips_markers_in_sub_sections() {
        let archive = doc("# Alpha\n_Archived on: 2024-06-01_\n\n## Done\n_Archived on: 2024-05-01_\n\n- [x] a\n");
        let out = restore_section(&Document::default(), &archive, 0);
        let restored = out.live.to_string();
        assert!(!restored.contains("_Archived on"));
        assert!(restored.contains("## Done\n- [x] a\n"));
        assert!(out.archive.is_empty());
    }

    #[test]
    fn test_archive_unknown_heading_is_noop() {
        let live = doc(LIVE);
        let archive = doc("# Old\n");
        let out = archive_section(&live, &archive, 3, date("2024-05-01"), true);
        assert_eq!(out.live, live);
        assert_eq!(out.archive, archive);
    }

    #[test]
    fn test_archive_and_restore_task() {
        let out = archive_task(&doc(LIVE), &Document::default(), 4);
        assert_eq!(out.live.to_string(), "# Alpha\n\n## Done\n- [x] a ~2024-04-01\n\n## Todo\n- [ ] c\n");
        assert_eq!(out.archive.to_string(), "# Alpha\n\n## Done\n- [x] b\n");

        let back = restore_task(&out.live, &out.archive, 3);
        assert_eq!(back.live.to_string(), LIVE);
        assert_eq!(back.archive.to_string(), "# Alpha\n\n## Done\n");
    }

    #[test]
    fn test_archive_completed_keeps_order() {
        let live = doc("# P\n- [x] one\n- [ ] two\n- [x] three\n## S\n- [x] four\n");
        let out = archive_completed(&live, &Document::default());
        assert_eq!(out.live.to_string(), "# P\n- [ ] two\n## S\n");
        assert_eq!(
            out.archive.to_string(),
            "# P\n- [x] one\n- [x] three\n\n## S\n- [x] four\n"
        );
        let again = archive_completed(&out.live, &out.archive);
        assert_eq!(again, out);
    }

    #[test]
    fn test_find_or_create_path_returns_insertion_line() {
        let d = doc("# Alpha\nintro\n\n## Sub\n");
        let (out, line) = find_or_create_path(&d, &[PathSegment::new(1, "Alpha")]);
        assert_eq!(out, d);
        assert_eq!(line, 2);

        let (out, line) = find_or_create_path(
            &Document::default(),
            &[PathSegment::new(1, "Alpha"), PathSegment::new(2, "Done")],
        );
        assert_eq!(out.to_string(), "# Alpha\n\n## Done\n");
        assert_eq!(line, 3);
    }

    #[test]
    fn test_marker_detection() {
        assert!(is_archive_marker("_Archived on: 2024-05-01_"));
        assert!(!is_archive_marker("_Archived on: someday_"));
    }
}
