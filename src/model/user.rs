use serde::{Deserialize, Serialize};

/// A person tasks can be assigned to.
///
/// Markdown refers to users only by `alias`, which is kept sanitized to
/// `[a-z0-9_]+`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub alias: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl User {
    /// Create a user, sanitizing the alias
    pub fn new(alias: &str, name: impl Into<String>) -> Self {
        User {
            alias: sanitize_alias(alias),
            name: name.into(),
            emails: Vec::new(),
            avatar: None,
        }
    }

    /// Display name, falling back to the alias
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.alias
        } else {
            &self.name
        }
    }
}

/// Lowercase, map spaces and dashes to `_`, drop anything outside `[a-z0-9_]`.
pub fn sanitize_alias(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('@')
        .chars()
        .filter_map(|c| match c {
            'a'..='z' | '0'..='9' | '_' => Some(c),
            'A'..='Z' => Some(c.to_ascii_lowercase()),
            ' ' | '-' => Some('_'),
            _ => None,
        })
        .collect()
}

/// Look up a user by alias
pub fn find_user<'a>(users: &'a [User], alias: &str) -> Option<&'a User> {
    users.iter().find(|u| u.alias == alias)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_alias() {
        assert_eq!(sanitize_alias("Bob"), "bob");
        assert_eq!(sanitize_alias("@mary-jane"), "mary_jane");
        assert_eq!(sanitize_alias(" Ann Lee!"), "ann_lee");
        assert_eq!(sanitize_alias("é"), "");
    }

    #[test]
    fn test_user_json_defaults() {
        let user: User = serde_json::from_str(r#"{"alias":"bob"}"#).unwrap();
        assert_eq!(user.display_name(), "bob");
        assert!(user.emails.is_empty());
    }
}
