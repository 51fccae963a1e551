//! Public short identifiers and lookup-key classification.
//!
//! Records are displayed publicly by the last six characters of their
//! canonical id. Resolving a short id back to a record has no index support:
//! the caller fetches every candidate and scans for a matching suffix, taking
//! the first match in creation order when several ids share a suffix.

use crate::types::{ObjectId, OBJECT_ID_LEN};

/// Number of trailing id characters shown publicly.
pub const SHORT_ID_LEN: usize = 6;

/// Whether `input` has the canonical id shape (24 ASCII hex characters).
pub fn is_canonical(input: &str) -> bool {
    input.len() == OBJECT_ID_LEN && input.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Whether `input` has the short-id shape (6 ASCII hex characters).
pub fn is_short_id(input: &str) -> bool {
    input.len() == SHORT_ID_LEN && input.bytes().all(|b| b.is_ascii_hexdigit())
}

/// How a public identifier should be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKey {
    /// Full id: direct lookup first, suffix scan on a miss.
    Canonical(ObjectId),
    /// Six hex characters: suffix scan.
    Short(String),
    /// Anything else is treated as a slug.
    Slug(String),
}

impl LookupKey {
    pub fn classify(input: &str) -> Self {
        let trimmed = input.trim();
        if let Some(id) = ObjectId::parse(trimmed) {
            Self::Canonical(id)
        } else if is_short_id(trimmed) {
            Self::Short(trimmed.to_ascii_lowercase())
        } else {
            Self::Slug(trimmed.to_ascii_lowercase())
        }
    }

    /// The suffix to scan for, if this key supports the fallback scan.
    pub fn scan_suffix(&self) -> Option<&str> {
        match self {
            Self::Canonical(id) => Some(id.as_str()),
            Self::Short(suffix) => Some(suffix),
            Self::Slug(_) => None,
        }
    }
}

/// Result of a linear suffix scan.
#[derive(Debug)]
pub struct SuffixScan<T> {
    /// The first candidate whose id ends with the suffix.
    pub first: Option<T>,
    /// How many candidates matched in total.
    pub matches: usize,
}

/// Scan `candidates` in order for ids ending with `suffix`.
///
/// The comparison is ASCII case-insensitive. Every candidate is visited so
/// that ambiguous suffixes can be reported.
pub fn scan_suffix<T>(
    candidates: impl IntoIterator<Item = T>,
    suffix: &str,
    id_of: impl Fn(&T) -> &str,
) -> SuffixScan<T> {
    let suffix = suffix.to_ascii_lowercase();
    let mut first = None;
    let mut matches = 0;

    for candidate in candidates {
        if id_of(&candidate).to_ascii_lowercase().ends_with(&suffix) {
            matches += 1;
            if first.is_none() {
                first = Some(candidate);
            }
        }
    }

    SuffixScan { first, matches }
}
