use chrono::NaiveDate;

/// What a single line of the document is, as far as the grammar cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// `#{n} text`, any depth; the model only tracks n <= 3
    Heading { level: usize, text: &'a str },
    /// `- [ ] body` or `- [x] body`
    Task { completed: bool, body: &'a str },
    /// `  - YYYY-MM-DD: body`
    Update { date: NaiveDate, body: &'a str },
    Blank,
    /// Anything else: paragraphs, plain list items, malformed lines
    Plain,
}

impl LineKind<'_> {
    pub fn is_blank(&self) -> bool {
        matches!(self, LineKind::Blank)
    }
}

/// Classify one line. Never fails; unrecognized lines are `Plain`.
pub fn classify(line: &str) -> LineKind<'_> {
    if line.trim().is_empty() {
        return LineKind::Blank;
    }
    if let Some(kind) = heading(line) {
        return kind;
    }
    if let Some(kind) = task(line) {
        return kind;
    }
    if let Some(kind) = update(line) {
        return kind;
    }
    LineKind::Plain
}

/// Classify every line of a document
pub fn classify_all(lines: &[String]) -> Vec<LineKind<'_>> {
    lines.iter().map(|l| classify(l)).collect()
}

fn heading(line: &str) -> Option<LineKind<'_>> {
    let level = line.len() - line.trim_start_matches('#').len();
    if level == 0 {
        return None;
    }
    let text = line[level..].strip_prefix(' ')?;
    Some(LineKind::Heading {
        level,
        text: text.trim(),
    })
}

fn task(line: &str) -> Option<LineKind<'_>> {
    let rest = line.strip_prefix("- [")?;
    let completed = match rest.as_bytes().first()? {
        b' ' => false,
        b'x' => true,
        _ => return None,
    };
    let body = rest[1..].strip_prefix("] ")?;
    Some(LineKind::Task { completed, body })
}

fn update(line: &str) -> Option<LineKind<'_>> {
    let rest = line.strip_prefix("  - ")?;
    let (date, body) = split_date_prefix(rest)?;
    let body = body.strip_prefix(": ")?;
    Some(LineKind::Update { date, body })
}

/// Split a leading `YYYY-MM-DD` off `s`.
fn split_date_prefix(s: &str) -> Option<(NaiveDate, &str)> {
    let bytes = s.as_bytes();
    if bytes.len() < 10 {
        return None;
    }
    let shape_ok = bytes[..10].iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }
    let date = parse_iso_date(&s[..10])?;
    Some((date, &s[10..]))
}

/// Parse a strict `YYYY-MM-DD` date
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    if s.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Find the last line of the task block starting at `task_idx`.
///
/// Update lines (with blank lines allowed between them) are part of the
/// block; trailing blank lines are not. The scan never goes past `last`.
pub fn block_end(kinds: &[LineKind<'_>], task_idx: usize, last: usize) -> usize {
    let mut end = task_idx;
    let mut cursor = task_idx + 1;
    while cursor <= last && cursor < kinds.len() {
        match kinds[cursor] {
            LineKind::Update { .. } => {
                end = cursor;
                cursor += 1;
            }
            LineKind::Blank => cursor += 1,
            _ => break,
        }
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_iso_date(s).unwrap()
    }

    #[test]
    fn test_classify_headings() {
        assert_eq!(
            classify("# Alpha"),
            LineKind::Heading {
                level: 1,
                text: "Alpha"
            }
        );
        assert_eq!(
            classify("#### Deep  "),
            LineKind::Heading {
                level: 4,
                text: "Deep"
            }
        );
        assert_eq!(classify("#tag"), LineKind::Plain);
        assert_eq!(classify("# "), LineKind::Heading { level: 1, text: "" });
    }

    #[test]
    fn test_heading_is_never_a_task() {
        assert!(matches!(
            classify("## - [ ] not a task"),
            LineKind::Heading { level: 2, .. }
        ));
    }

    #[test]
    fn test_classify_tasks() {
        assert_eq!(
            classify("- [ ] Ship it"),
            LineKind::Task {
                completed: false,
                body: "Ship it"
            }
        );
        assert_eq!(
            classify("- [x] Done"),
            LineKind::Task {
                completed: true,
                body: "Done"
            }
        );
        assert_eq!(classify("- [X] Upper"), LineKind::Plain);
        assert_eq!(classify("- [ ]"), LineKind::Plain);
        assert_eq!(classify("  - [ ] nested"), LineKind::Plain);
        assert_eq!(classify("- plain item"), LineKind::Plain);
    }

    #[test]
    fn test_classify_updates() {
        assert_eq!(
            classify("  - 2024-03-01: Called vendor (@bob)"),
            LineKind::Update {
                date: date("2024-03-01"),
                body: "Called vendor (@bob)"
            }
        );
        assert_eq!(classify("  - 2024-13-01: bad month"), LineKind::Plain);
        assert_eq!(classify("  - 2024-03-01 no colon"), LineKind::Plain);
        assert_eq!(classify("    - 2024-03-01: too deep"), LineKind::Plain);
        assert_eq!(classify("  - note: not dated"), LineKind::Plain);
    }

    #[test]
    fn test_block_end_skips_interspersed_blanks() {
        let lines: Vec<String> = [
            "- [ ] Task",
            "  - 2024-01-01: one",
            "",
            "  - 2024-01-02: two",
            "",
            "Paragraph",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let kinds = classify_all(&lines);
        assert_eq!(block_end(&kinds, 0, lines.len() - 1), 3);
        assert_eq!(block_end(&kinds, 0, 1), 1);
    }

    #[test]
    fn test_block_end_stops_at_malformed_update() {
        let lines: Vec<String> = ["- [ ] Task", "  - someday: maybe", "  - 2024-01-02: two"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let kinds = classify_all(&lines);
        assert_eq!(block_end(&kinds, 0, 2), 0);
    }
}
