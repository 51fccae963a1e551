//! Explicit filter and sort specifications for collection listings.
//!
//! Each entity turns its typed query parameters into a [`FilterSpec`]; the
//! spec is checked against the entity's allow-listed fields with
//! [`FilterSpec::validate`] before any storage query is built. Both storage
//! backends interpret the same spec: Postgres translates it to SQL, the
//! in-memory store evaluates it with [`FilterSpec::matches`].

use serde_json::Value;

use crate::error::CoreError;

/// Longest accepted filter value, in characters.
pub const MAX_FILTER_VALUE_LEN: usize = 200;

/// How a single field is compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Case-sensitive equality.
    Equals(String),
    /// Case-insensitive equality (emails).
    EqualsIgnoreCase(String),
    /// Case-insensitive substring match.
    Contains(String),
    /// Boolean flag equality.
    Flag(bool),
}

/// The field a condition applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRef {
    /// A top-level key of the document body.
    Body(&'static str),
    /// The engine-managed owner id.
    Owner,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub field: FieldRef,
    pub matcher: Matcher,
}

/// Conjunction of conditions. An empty spec matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    conditions: Vec<Condition>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Add a condition unconditionally.
    pub fn with(mut self, field: FieldRef, matcher: Matcher) -> Self {
        self.conditions.push(Condition { field, matcher });
        self
    }

    /// Case-sensitive equality on `field`, skipped when `value` is absent or blank.
    pub fn equals(self, field: &'static str, value: Option<&str>) -> Self {
        match non_blank(value) {
            Some(v) => self.with(FieldRef::Body(field), Matcher::Equals(v.to_string())),
            None => self,
        }
    }

    /// Case-insensitive equality on `field`, skipped when `value` is absent or blank.
    pub fn equals_ignore_case(self, field: &'static str, value: Option<&str>) -> Self {
        match non_blank(value) {
            Some(v) => self.with(
                FieldRef::Body(field),
                Matcher::EqualsIgnoreCase(v.to_string()),
            ),
            None => self,
        }
    }

    /// Case-insensitive substring match on `field`, skipped when `value` is absent or blank.
    pub fn contains(self, field: &'static str, value: Option<&str>) -> Self {
        match non_blank(value) {
            Some(v) => self.with(FieldRef::Body(field), Matcher::Contains(v.to_string())),
            None => self,
        }
    }

    /// Boolean flag on `field`, skipped when `value` is `None`.
    pub fn flag(self, field: &'static str, value: Option<bool>) -> Self {
        match value {
            Some(v) => self.with(FieldRef::Body(field), Matcher::Flag(v)),
            None => self,
        }
    }

    /// Restrict to documents owned by `owner_id`.
    pub fn owned_by(self, owner_id: &str) -> Self {
        self.with(FieldRef::Owner, Matcher::Equals(owner_id.to_string()))
    }

    /// Reject body fields outside `allowed` and oversized values.
    pub fn validate(&self, allowed: &[&str]) -> Result<(), CoreError> {
        for condition in &self.conditions {
            if let FieldRef::Body(field) = condition.field {
                if !allowed.contains(&field) {
                    return Err(CoreError::Validation(format!(
                        "Filtering on '{field}' is not supported. Supported fields: {}",
                        allowed.join(", ")
                    )));
                }
            }
            let len = match &condition.matcher {
                Matcher::Equals(v) | Matcher::EqualsIgnoreCase(v) | Matcher::Contains(v) => {
                    v.chars().count()
                }
                Matcher::Flag(_) => 0,
            };
            if len > MAX_FILTER_VALUE_LEN {
                return Err(CoreError::Validation(format!(
                    "Filter value must be at most {MAX_FILTER_VALUE_LEN} characters"
                )));
            }
        }
        Ok(())
    }

    /// Evaluate the filter against a document body and its owner.
    pub fn matches(&self, body: &Value, owner_id: Option<&str>) -> bool {
        self.conditions.iter().all(|condition| match condition.field {
            FieldRef::Owner => match (&condition.matcher, owner_id) {
                (Matcher::Equals(expected), Some(actual)) => expected == actual,
                _ => false,
            },
            FieldRef::Body(field) => body
                .get(field)
                .is_some_and(|value| matcher_accepts(&condition.matcher, value)),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn matcher_accepts(matcher: &Matcher, value: &Value) -> bool {
    if let Matcher::Flag(expected) = matcher {
        return value.as_bool() == Some(*expected);
    }

    // Array fields match when any element matches.
    if let Value::Array(items) = value {
        return items.iter().any(|item| scalar_accepts(matcher, item));
    }
    scalar_accepts(matcher, value)
}

fn scalar_accepts(matcher: &Matcher, value: &Value) -> bool {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return false,
    };

    match matcher {
        Matcher::Equals(expected) => text == *expected,
        Matcher::EqualsIgnoreCase(expected) => text.to_lowercase() == expected.to_lowercase(),
        Matcher::Contains(needle) => text.to_lowercase().contains(&needle.to_lowercase()),
        Matcher::Flag(_) => false,
    }
}

/// Escape `%`, `_` and `\` so `input` matches literally inside a LIKE pattern.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    CreatedAt,
    UpdatedAt,
    Sequence,
}

/// Sort order for a listing. Ties always break on id in the same direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub descending: bool,
}

impl SortSpec {
    pub const NEWEST_FIRST: Self = Self {
        key: SortKey::CreatedAt,
        descending: true,
    };

    pub const BY_SEQUENCE: Self = Self {
        key: SortKey::Sequence,
        descending: false,
    };

    /// Parse `created_at`, `updated_at` or `sequence`, optionally prefixed
    /// with `-` for descending order.
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let (descending, name) = match input.trim().strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input.trim()),
        };
        let key = match name {
            "created_at" => SortKey::CreatedAt,
            "updated_at" => SortKey::UpdatedAt,
            "sequence" => SortKey::Sequence,
            other => {
                return Err(CoreError::Validation(format!(
                    "Unknown sort key '{other}'. Expected created_at, updated_at or sequence"
                )))
            }
        };
        Ok(Self { key, descending })
    }

    /// Parse an optional query value, falling back to `default`.
    pub fn parse_or(input: Option<&str>, default: Self) -> Result<Self, CoreError> {
        match input.map(str::trim).filter(|s| !s.is_empty()) {
            Some(value) => Self::parse(value),
            None => Ok(default),
        }
    }
}
