//! Slug normalization and candidate derivation.
//!
//! Slugs are lowercase ASCII words joined by single hyphens. Uniqueness
//! within a collection is the storage layer's job: callers try candidates
//! produced by [`with_suffix`] until one is free.

/// Upper bound on suffix attempts before assignment gives up.
pub const MAX_SLUG_ATTEMPTS: u32 = 1000;

/// Maximum slug length before any suffix is appended.
pub const MAX_SLUG_BASE_LEN: usize = 80;

/// Normalize arbitrary text into a slug.
///
/// - ASCII letters are lowercased, digits kept.
/// - Whitespace, `-` and `_` act as separators and collapse into one `-`.
/// - Every other character is dropped.
/// - Leading and trailing separators are trimmed.
///
/// Returns an empty string when nothing survives.
///
/// # Examples
///
/// ```
/// use eduboard_core::slug::normalize;
///
/// assert_eq!(normalize("Ravi  Kumar"), "ravi-kumar");
/// assert_eq!(normalize("St. Xavier's High_School"), "st-xaviers-high-school");
/// ```
pub fn normalize(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_separator = false;

    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_separator = true;
        }
    }

    if slug.len() > MAX_SLUG_BASE_LEN {
        slug.truncate(MAX_SLUG_BASE_LEN);
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    slug
}

/// Normalize `candidate`, falling back to `fallback` when it is empty.
pub fn base_slug(candidate: &str, fallback: &str) -> String {
    let slug = normalize(candidate);
    if slug.is_empty() {
        normalize(fallback)
    } else {
        slug
    }
}

/// The `attempt`-th candidate for `base`: the base itself, then `base-1`,
/// `base-2`, and so on.
pub fn with_suffix(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        base.to_string()
    } else {
        format!("{base}-{attempt}")
    }
}

/// Build a slug candidate from contact details: the email's local part
/// followed by the last four digits of the phone number.
///
/// # Examples
///
/// ```
/// use eduboard_core::slug::contact_candidate;
///
/// assert_eq!(contact_candidate("Priya.S@mail.com", "+91 98765 43210"), "Priya.S 3210");
/// ```
pub fn contact_candidate(email: &str, phone: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let digits: Vec<char> = phone.chars().filter(char::is_ascii_digit).collect();
    let tail: String = digits[digits.len().saturating_sub(4)..].iter().collect();

    if tail.is_empty() {
        local.to_string()
    } else {
        format!("{local} {tail}")
    }
}
