use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::model::task::{Cost, DateKind};
use crate::parse::line::parse_iso_date;

static ASSIGNEE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s+)\(@([A-Za-z0-9_]+)\)").expect("valid regex"));
static COST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s+)\(\$(\d+(?:\.\d{1,2})?)\)").expect("valid regex"));
static COMPLETION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s+)~(\d{4}-\d{2}-\d{2})").expect("valid regex"));
static CREATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s+)\+(\d{4}-\d{2}-\d{2})").expect("valid regex"));
static DUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s+)!(\d{4}-\d{2}-\d{2})").expect("valid regex"));

/// The optional metadata carried on a task line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskTokens {
    pub assignee: Option<String>,
    pub cost: Option<Cost>,
    pub creation_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,
}

impl TaskTokens {
    fn record(&mut self, kind: TokenKind, value: &str) {
        match kind {
            TokenKind::Assignee => self.assignee = Some(value.to_string()),
            TokenKind::Cost => self.cost = Cost::parse(value),
            TokenKind::Creation => self.creation_date = parse_iso_date(value),
            TokenKind::Due => self.due_date = parse_iso_date(value),
            TokenKind::Completion => self.completion_date = parse_iso_date(value),
        }
    }
}

/// One kind of metadata token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Assignee,
    Cost,
    Creation,
    Due,
    Completion,
}

impl TokenKind {
    /// Render order of tokens after the task text
    pub const CANONICAL: [TokenKind; 5] = [
        TokenKind::Assignee,
        TokenKind::Cost,
        TokenKind::Creation,
        TokenKind::Due,
        TokenKind::Completion,
    ];

    fn regex(self) -> &'static Regex {
        match self {
            TokenKind::Assignee => &*ASSIGNEE_RE,
            TokenKind::Cost => &*COST_RE,
            TokenKind::Creation => &*CREATION_RE,
            TokenKind::Due => &*DUE_RE,
            TokenKind::Completion => &*COMPLETION_RE,
        }
    }

    fn accepts(self, value: &str) -> bool {
        match self {
            TokenKind::Assignee => true,
            TokenKind::Cost => Cost::parse(value).is_some(),
            TokenKind::Creation | TokenKind::Due | TokenKind::Completion => {
                parse_iso_date(value).is_some()
            }
        }
    }

    /// The token as written: `(@bob)`, `($12.50)`, `+2024-01-01`, ...
    pub fn render(self, value: &str) -> String {
        match self {
            TokenKind::Assignee => format!("(@{})", value),
            TokenKind::Cost => format!("(${})", value),
            TokenKind::Creation => format!("+{}", value),
            TokenKind::Due => format!("!{}", value),
            TokenKind::Completion => format!("~{}", value),
        }
    }

    /// Kinds rendered after this one
    fn later(self) -> impl Iterator<Item = TokenKind> {
        TokenKind::CANONICAL
            .into_iter()
            .skip_while(move |k| *k != self)
            .skip(1)
    }
}

impl From<DateKind> for TokenKind {
    fn from(kind: DateKind) -> Self {
        match kind {
            DateKind::Creation => TokenKind::Creation,
            DateKind::Due => TokenKind::Due,
            DateKind::Completion => TokenKind::Completion,
        }
    }
}

/// Where a token sits in a body. `start..end` includes the whitespace
/// before it; `token_start..end` is the token itself.
#[derive(Debug, Clone, Copy)]
struct TokenMatch<'a> {
    start: usize,
    token_start: usize,
    end: usize,
    value: &'a str,
}

/// The last well-formed token of `kind` in `text`.
///
/// A token must be followed by whitespace or the end of text, so
/// `+2024-01-012` and `($5)vendor` are plain text.
fn find_token(text: &str, kind: TokenKind) -> Option<TokenMatch<'_>> {
    kind.regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let (whole, value) = (caps.get(0)?, caps.get(1)?);
            let bounded = text[whole.end()..]
                .chars()
                .next()
                .is_none_or(char::is_whitespace);
            if !bounded || !kind.accepts(value.as_str()) {
                return None;
            }
            let lead = whole.as_str().len() - whole.as_str().trim_start().len();
            Some(TokenMatch {
                start: whole.start(),
                token_start: whole.start() + lead,
                end: whole.end(),
                value: value.as_str(),
            })
        })
        .last()
}

fn remove_match(text: &str, m: &TokenMatch<'_>) -> String {
    let rest = &text[m.end..];
    if m.start == 0 {
        rest.trim_start().to_string()
    } else {
        format!("{}{}", &text[..m.start], rest)
    }
}

/// Strip the metadata tokens out of a task body.
///
/// Each token kind is matched by its own pattern wherever it appears, so
/// the order of tokens in the text does not matter. When a kind appears
/// more than once the last occurrence is the token and earlier ones stay in
/// the text, so rendering the result back is stable.
/// Malformed tokens (e.g. `~2024-13-01`) stay in the text.
pub fn extract_tokens(raw: &str) -> (String, TaskTokens) {
    let mut text = raw.to_string();
    let mut tokens = TaskTokens::default();
    for kind in TokenKind::CANONICAL {
        if let Some(m) = find_token(&text, kind) {
            tokens.record(kind, m.value);
            text = remove_match(&text, &m);
        }
    }
    (text.trim().to_string(), tokens)
}

/// Render clean text plus tokens in canonical order:
/// `text (@assignee) ($cost) +creation !due ~completion`
pub fn render_tokens(clean: &str, tokens: &TaskTokens) -> String {
    let fmt_date = |d: NaiveDate| d.format("%Y-%m-%d").to_string();
    let values = [
        tokens.assignee.clone(),
        tokens.cost.map(|c| c.to_string()),
        tokens.creation_date.map(fmt_date),
        tokens.due_date.map(fmt_date),
        tokens.completion_date.map(fmt_date),
    ];
    let mut out = clean.trim().to_string();
    for (kind, value) in TokenKind::CANONICAL.into_iter().zip(values) {
        if let Some(value) = value {
            out.push(' ');
            out.push_str(&kind.render(&value));
        }
    }
    out.trim_start().to_string()
}

/// Replace, insert or remove one token in a task body, leaving the rest of
/// the text as written.
///
/// An existing token is rewritten where it stands. A new token goes in
/// front of the first token that renders after it, or at the end.
pub fn set_token(body: &str, kind: TokenKind, value: Option<&str>) -> String {
    match (find_token(body, kind), value) {
        (Some(m), Some(value)) => format!(
            "{}{}{}",
            &body[..m.token_start],
            kind.render(value),
            &body[m.end..]
        ),
        (Some(m), None) => remove_match(body, &m),
        (None, Some(value)) => {
            let at = kind
                .later()
                .filter_map(|k| find_token(body, k))
                .map(|m| m.start)
                .min()
                .unwrap_or(body.len());
            let token = kind.render(value);
            [body[..at].trim_end(), token.as_str(), body[at..].trim_start()]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        }
        (None, None) => body.to_string(),
    }
}

/// Remove every token of `kind` from a task body
pub fn strip_tokens(body: &str, kind: TokenKind) -> String {
    let mut out = body.to_string();
    while let Some(m) = find_token(&out, kind) {
        out = remove_match(&out, &m);
    }
    out
}

/// Split an update body into its text and optional `(@alias)`.
pub fn extract_update_tokens(raw: &str) -> (String, Option<String>) {
    match find_token(raw, TokenKind::Assignee) {
        Some(m) => (
            remove_match(raw, &m).trim().to_string(),
            Some(m.value.to_string()),
        ),
        None => (raw.trim().to_string(), None),
    }
}

/// Inverse of [`extract_update_tokens`]
pub fn render_update_tokens(text: &str, alias: Option<&str>) -> String {
    match alias {
        Some(alias) => format!("{} (@{})", text.trim(), alias)
            .trim_start()
            .to_string(),
        None => text.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_iso_date(s).unwrap()
    }

    #[test]
    fn test_extract_all_tokens() {
        let (text, tokens) =
            extract_tokens("Ship release (@bob) ($2000) +2024-01-01 !2024-02-01 ~2024-02-10");
        assert_eq!(text, "Ship release");
        assert_eq!(tokens.assignee.as_deref(), Some("bob"));
        assert_eq!(tokens.cost, Some(Cost::from_cents(200_000)));
        assert_eq!(tokens.creation_date, Some(date("2024-01-01")));
        assert_eq!(tokens.due_date, Some(date("2024-02-01")));
        assert_eq!(tokens.completion_date, Some(date("2024-02-10")));
    }

    #[test]
    fn test_extract_is_order_independent() {
        let (a_text, a) = extract_tokens("+2024-01-01 !2024-02-01 Ship it ($12.5) (@ann)");
        let (b_text, b) = extract_tokens("Ship it (@ann) ($12.5) +2024-01-01 !2024-02-01");
        assert_eq!(a_text, "Ship it");
        assert_eq!(a_text, b_text);
        assert_eq!(a, b);
    }

    #[test]
    fn test_tokens_in_the_middle() {
        let (text, tokens) = extract_tokens("Call (@ann) the vendor");
        assert_eq!(text, "Call the vendor");
        assert_eq!(tokens.assignee.as_deref(), Some("ann"));
    }

    #[test]
    fn test_malformed_tokens_stay_in_text() {
        let (text, tokens) = extract_tokens("Fix ~2024-13-01 and +2024-01-012 ($1.234)");
        assert_eq!(text, "Fix ~2024-13-01 and +2024-01-012 ($1.234)");
        assert_eq!(tokens, TaskTokens::default());
    }

    #[test]
    fn test_duplicate_token_last_wins() {
        let (text, tokens) = extract_tokens("Pair (@ann) (@bob)");
        assert_eq!(text, "Pair (@ann)");
        assert_eq!(tokens.assignee.as_deref(), Some("bob"));
        assert_eq!(render_tokens(&text, &tokens), "Pair (@ann) (@bob)");
    }

    #[test]
    fn test_token_needs_trailing_boundary() {
        let (text, tokens) = extract_tokens("Pay ($5)vendor and (@ann)'s list");
        assert_eq!(text, "Pay ($5)vendor and (@ann)'s list");
        assert_eq!(tokens, TaskTokens::default());
        let (text, tokens) = extract_tokens("Pay ($5) vendor");
        assert_eq!(text, "Pay vendor");
        assert_eq!(tokens.cost, Some(Cost::from_cents(500)));
    }

    #[test]
    fn test_set_token_in_place() {
        let body = "Call (@ann) the vendor +2024-01-01";
        assert_eq!(
            set_token(body, TokenKind::Assignee, Some("bob")),
            "Call (@bob) the vendor +2024-01-01"
        );
        assert_eq!(
            set_token(body, TokenKind::Assignee, None),
            "Call the vendor +2024-01-01"
        );
        assert_eq!(
            set_token(body, TokenKind::Cost, Some("5")),
            "Call (@ann) the vendor ($5) +2024-01-01"
        );
        assert_eq!(
            set_token(body, TokenKind::Due, Some("2024-02-01")),
            "Call (@ann) the vendor +2024-01-01 !2024-02-01"
        );
        assert_eq!(set_token("+2024-01-01 Call", TokenKind::Creation, None), "Call");
        assert_eq!(set_token("", TokenKind::Assignee, Some("bob")), "(@bob)");
    }

    #[test]
    fn test_strip_tokens_removes_every_match() {
        assert_eq!(
            strip_tokens("Old ~2023-01-01 note ~2023-02-01", TokenKind::Completion),
            "Old note"
        );
        assert_eq!(strip_tokens("Fix ~2024-13-01", TokenKind::Completion), "Fix ~2024-13-01");
    }

    #[test]
    fn test_render_canonical_order() {
        let tokens = TaskTokens {
            assignee: Some("bob".into()),
            cost: Some(Cost::from_cents(200_000)),
            creation_date: Some(date("2024-01-01")),
            due_date: Some(date("2024-02-01")),
            completion_date: Some(date("2024-02-10")),
        };
        assert_eq!(
            render_tokens("Ship release", &tokens),
            "Ship release (@bob) ($2000) +2024-01-01 !2024-02-01 ~2024-02-10"
        );
        assert_eq!(render_tokens("Bare", &TaskTokens::default()), "Bare");
    }

    #[test]
    fn test_render_without_text() {
        let tokens = TaskTokens {
            assignee: Some("bob".into()),
            ..TaskTokens::default()
        };
        assert_eq!(render_tokens("", &tokens), "(@bob)");
        let (text, back) = extract_tokens("(@bob)");
        assert_eq!(text, "");
        assert_eq!(back, tokens);
    }

    #[test]
    fn test_update_tokens() {
        assert_eq!(
            extract_update_tokens("Called vendor (@bob)"),
            ("Called vendor".to_string(), Some("bob".to_string()))
        );
        assert_eq!(render_update_tokens("Called vendor", Some("bob")), "Called vendor (@bob)");
        assert_eq!(render_update_tokens("Note", None), "Note");
    }
}
