use std::fmt;

use serde::{Deserialize, Serialize};

/// The raw plan text as an ordered list of lines.
///
/// This is the single source of truth: projects, headings and tasks are
/// always re-derived from it. Lines never contain `\n`; whether the text
/// ended with a newline is remembered separately so that converting back
/// to a string is byte-for-byte lossless.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Document {
    lines: Vec<String>,
    trailing_newline: bool,
}

impl Document {
    pub fn new(lines: Vec<String>, trailing_newline: bool) -> Self {
        Document {
            lines,
            trailing_newline,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line(&self, idx: usize) -> Option<&str> {
        self.lines.get(idx).map(|l| l.as_str())
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn trailing_newline(&self) -> bool {
        self.trailing_newline
    }

    /// Consume the document, returning its lines and newline flag.
    pub fn into_parts(self) -> (Vec<String>, bool) {
        (self.lines, self.trailing_newline)
    }

    /// Same newline convention, new lines. No lines at all is the empty
    /// document.
    pub fn with_lines(&self, lines: Vec<String>) -> Document {
        let trailing_newline = self.trailing_newline && !lines.is_empty();
        Document {
            lines,
            trailing_newline,
        }
    }

    /// Replace a single line. Out-of-range indexes return `None`.
    pub fn with_line(&self, idx: usize, line: String) -> Option<Document> {
        if idx >= self.lines.len() {
            return None;
        }
        let mut lines = self.lines.clone();
        lines[idx] = line;
        Some(self.with_lines(lines))
    }

    /// Replace `count` lines starting at `start` with `replacement`.
    /// Returns `None` when the range does not fit inside the document.
    pub fn splice(&self, start: usize, count: usize, replacement: Vec<String>) -> Option<Document> {
        let end = start.checked_add(count)?;
        if end > self.lines.len() {
            return None;
        }
        let mut lines = self.lines.clone();
        lines.splice(start..end, replacement);
        Some(self.with_lines(lines))
    }
}

/// The live plan and its archive, edited together
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Documents {
    pub live: Document,
    pub archive: Document,
}

impl From<&str> for Document {
    fn from(text: &str) -> Self {
        if text.is_empty() {
            return Document::default();
        }
        let (body, trailing_newline) = match text.strip_suffix('\n') {
            Some(body) => (body, true),
            None => (text, false),
        };
        Document {
            lines: body.split('\n').map(|l| l.to_string()).collect(),
            trailing_newline,
        }
    }
}

impl From<String> for Document {
    fn from(text: String) -> Self {
        Document::from(text.as_str())
    }
}

impl From<Document> for String {
    fn from(doc: Document) -> Self {
        doc.to_string()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))?;
        if self.trailing_newline {
            f.write_str("\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_bytes() {
        for text in ["", "a", "a\n", "a\n\nb", "a\n\nb\n\n", "\n", "x\r\ny"] {
            assert_eq!(Document::from(text).to_string(), text, "text: {:?}", text);
        }
    }

    #[test]
    fn test_trailing_newline_is_not_a_line() {
        let doc = Document::from("one\ntwo\n");
        assert_eq!(doc.len(), 2);
        assert!(doc.trailing_newline());
    }

    #[test]
    fn test_splice_out_of_range() {
        let doc = Document::from("a\nb");
        assert!(doc.splice(1, 2, vec![]).is_none());
        assert!(doc.splice(usize::MAX, 2, vec![]).is_none());
        let doc = doc.splice(0, 1, vec!["x".into(), "y".into()]).unwrap();
        assert_eq!(doc.to_string(), "x\ny\nb");
    }
}
