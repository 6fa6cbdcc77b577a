use regex::{NoExpand, Regex};

use crate::model::document::{Document, Documents};
use crate::model::user::{User, find_user, sanitize_alias};

/// Error type for user management
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UserError {
    #[error("invalid alias: {0:?}")]
    InvalidAlias(String),
    #[error("alias already in use: {0}")]
    DuplicateAlias(String),
    #[error("unknown user: {0}")]
    UnknownUser(String),
}

fn mention_re(alias: &str, leading_space: bool) -> Option<Regex> {
    let prefix = if leading_space { r"[ \t]*" } else { "" };
    Regex::new(&format!(r"{}\(@{}\)", prefix, regex::escape(alias))).ok()
}

/// Replace every `(@old)` mention with `(@new)`
pub fn rename_mentions(doc: &Document, old: &str, new: &str) -> Document {
    let Some(re) = mention_re(old, false) else {
        return doc.clone();
    };
    let replacement = format!("(@{})", new);
    let lines = doc
        .lines()
        .iter()
        .map(|l| re.replace_all(l, NoExpand(&replacement)).into_owned())
        .collect();
    doc.with_lines(lines)
}

/// Remove every `(@alias)` mention along with the whitespace before it
pub fn remove_mentions(doc: &Document, alias: &str) -> Document {
    let Some(re) = mention_re(alias, true) else {
        return doc.clone();
    };
    let lines = doc
        .lines()
        .iter()
        .map(|l| re.replace_all(l, "").into_owned())
        .collect();
    doc.with_lines(lines)
}

/// Add a user. The alias is sanitized and must be unique.
pub fn add_user(users: &[User], mut user: User) -> Result<Vec<User>, UserError> {
    let alias = sanitize_alias(&user.alias);
    if alias.is_empty() {
        return Err(UserError::InvalidAlias(user.alias));
    }
    if find_user(users, &alias).is_some() {
        return Err(UserError::DuplicateAlias(alias));
    }
    user.alias = alias;
    let mut users = users.to_vec();
    users.push(user);
    Ok(users)
}

/// Change a user's alias in the user list and in both documents
pub fn rename_user(
    users: &[User],
    docs: &Documents,
    old: &str,
    new: &str,
) -> Result<(Vec<User>, Documents), UserError> {
    let new_alias = sanitize_alias(new);
    if new_alias.is_empty() {
        return Err(UserError::InvalidAlias(new.to_string()));
    }
    if find_user(users, old).is_none() {
        return Err(UserError::UnknownUser(old.to_string()));
    }
    if new_alias != old && find_user(users, &new_alias).is_some() {
        return Err(UserError::DuplicateAlias(new_alias));
    }

    let users = users
        .iter()
        .cloned()
        .map(|mut u| {
            if u.alias == old {
                u.alias = new_alias.clone();
            }
            u
        })
        .collect();
    let docs = Documents {
        live: rename_mentions(&docs.live, old, &new_alias),
        archive: rename_mentions(&docs.archive, old, &new_alias),
    };
    tracing::info!(old, new = %new_alias, "renamed user");
    Ok((users, docs))
}

/// Remove a user and every mention of them from both documents
pub fn delete_user(
    users: &[User],
    docs: &Documents,
    alias: &str,
) -> Result<(Vec<User>, Documents), UserError> {
    if find_user(users, alias).is_none() {
        return Err(UserError::UnknownUser(alias.to_string()));
    }
    let users = users.iter().filter(|u| u.alias != alias).cloned().collect();
    let docs = Documents {
        live: remove_mentions(&docs.live, alias),
        archive: remove_mentions(&docs.archive, alias),
    };
    tracing::info!(alias, "deleted user");
    Ok((users, docs))
}
