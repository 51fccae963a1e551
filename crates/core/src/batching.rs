//! Recipient list preparation for batched notification email.

use std::collections::HashSet;

/// Default number of recipients per outgoing message.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Deduplicate recipient addresses case-insensitively.
///
/// Addresses are trimmed; blanks and strings without an `@` are dropped.
/// The first spelling of each address wins and input order is preserved.
pub fn dedupe_recipients<I, S>(addresses: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut unique = Vec::new();

    for address in addresses {
        let address = address.as_ref().trim();
        if address.is_empty() || !address.contains('@') {
            continue;
        }
        if seen.insert(address.to_lowercase()) {
            unique.push(address.to_string());
        }
    }

    unique
}

/// Split recipients into chunks of at most `size` (a size of zero is treated as one).
pub fn chunk_recipients(recipients: &[String], size: usize) -> Vec<Vec<String>> {
    recipients
        .chunks(size.max(1))
        .map(<[String]>::to_vec)
        .collect()
}
