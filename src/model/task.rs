use std::fmt;
use std::iter::Sum;
use std::ops::Add;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::user::User;

/// A monetary estimate, stored in cents to keep two-decimal precision exact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cost(u64);

impl Cost {
    pub const ZERO: Cost = Cost(0);

    pub fn from_cents(cents: u64) -> Self {
        Cost(cents)
    }

    pub fn cents(self) -> u64 {
        self.0
    }

    /// Parse an amount like `2000`, `12.5` or `12.05` (at most two decimals).
    pub fn parse(amount: &str) -> Option<Cost> {
        let amount = amount.trim().trim_start_matches('$');
        let (whole, frac) = match amount.split_once('.') {
            Some((w, f)) => (w, f),
            None => (amount, ""),
        };
        if whole.is_empty()
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || frac.len() > 2
            || !frac.bytes().all(|b| b.is_ascii_digit())
            || (amount.contains('.') && frac.is_empty())
        {
            return None;
        }
        let whole: u64 = whole.parse().ok()?;
        let frac_cents: u64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().ok()? * 10,
            _ => frac.parse().ok()?,
        };
        whole.checked_mul(100)?.checked_add(frac_cents).map(Cost)
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 100 == 0 {
            write!(f, "{}", self.0 / 100)
        } else {
            write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
        }
    }
}

impl Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Cost) -> Cost {
        Cost(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Cost {
    fn sum<I: Iterator<Item = Cost>>(iter: I) -> Cost {
        iter.fold(Cost::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Cost> for Cost {
    fn sum<I: Iterator<Item = &'a Cost>>(iter: I) -> Cost {
        iter.copied().sum()
    }
}

impl Serialize for Cost {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0 as f64 / 100.0)
    }
}

impl<'de> Deserialize<'de> for Cost {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        if !value.is_finite() || value < 0.0 {
            return Err(serde::de::Error::custom("cost must be a non-negative number"));
        }
        Ok(Cost((value * 100.0).round() as u64))
    }
}

/// Which of the three task dates an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateKind {
    /// `+YYYY-MM-DD`
    Creation,
    /// `!YYYY-MM-DD`
    Due,
    /// `~YYYY-MM-DD`
    Completion,
}

impl DateKind {
    /// The sigil that prefixes this date in a task line
    pub fn sigil(self) -> char {
        match self {
            DateKind::Creation => '+',
            DateKind::Due => '!',
            DateKind::Completion => '~',
        }
    }
}

/// A dated note nested under a task: `  - 2024-01-05: text (@alias)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub line_index: usize,
    pub date: NaiveDate,
    pub text: String,
    pub assignee_alias: Option<String>,
}

/// A checkbox task with its metadata tokens and update trail.
///
/// Identified only by its line position within one parse result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Line of the `- [ ]` / `- [x]` marker (0-indexed)
    pub line_index: usize,
    /// Last line belonging to this task (its own line or its last update)
    pub block_end_line: usize,
    /// Task text with metadata tokens stripped
    pub text: String,
    pub completed: bool,
    /// Weak reference to a user; may not resolve
    pub assignee_alias: Option<String>,
    pub creation_date: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub cost: Option<Cost>,
    pub updates: Vec<TaskUpdate>,
}

impl Task {
    /// Number of lines from the marker line through the last update
    pub fn line_count(&self) -> usize {
        self.block_end_line - self.line_index + 1
    }

    /// Resolve the assignee alias against a user list.
    pub fn assignee<'a>(&self, users: &'a [User]) -> Option<&'a User> {
        self.assignee_alias
            .as_deref()
            .and_then(|alias| super::user::find_user(users, alias))
    }

    pub fn date(&self, kind: DateKind) -> Option<NaiveDate> {
        match kind {
            DateKind::Creation => self.creation_date,
            DateKind::Due => self.due_date,
            DateKind::Completion => self.completion_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_parse() {
        assert_eq!(Cost::parse("2000"), Some(Cost::from_cents(200_000)));
        assert_eq!(Cost::parse("12.5"), Some(Cost::from_cents(1250)));
        assert_eq!(Cost::parse("12.05"), Some(Cost::from_cents(1205)));
        assert_eq!(Cost::parse("$3"), Some(Cost::from_cents(300)));
        assert_eq!(Cost::parse("12.345"), None);
        assert_eq!(Cost::parse("12."), None);
        assert_eq!(Cost::parse(".5"), None);
        assert_eq!(Cost::parse("-4"), None);
        assert_eq!(Cost::parse("abc"), None);
    }

    #[test]
    fn test_cost_display() {
        assert_eq!(Cost::from_cents(200_000).to_string(), "2000");
        assert_eq!(Cost::from_cents(1250).to_string(), "12.50");
        assert_eq!(Cost::from_cents(5).to_string(), "0.05");
    }

    #[test]
    fn test_cost_sum_and_json() {
        let total: Cost = [Cost::from_cents(150), Cost::from_cents(250)].iter().sum();
        assert_eq!(total, Cost::from_cents(400));
        assert_eq!(serde_json::to_string(&total).unwrap(), "4.0");
        let back: Cost = serde_json::from_str("12.5").unwrap();
        assert_eq!(back, Cost::from_cents(1250));
    }
}
