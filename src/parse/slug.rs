use std::collections::HashSet;

/// Hands out heading anchors that are unique within one parse pass.
///
/// The first `Notes` becomes `notes`, the next `notes-2`, and so on.
#[derive(Debug, Default)]
pub struct SlugGenerator {
    used: HashSet<String>,
}

impl SlugGenerator {
    pub fn new() -> Self {
        SlugGenerator::default()
    }

    pub fn slug(&mut self, text: &str) -> String {
        let base = slugify(text);
        if self.used.insert(base.clone()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}-{}", base, n);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Lowercase, keep alphanumerics and `_`, turn whitespace and `-` runs into a
/// single `-`, drop everything else.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.trim().chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}
