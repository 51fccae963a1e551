//! Unique slug assignment against a collection.

use eduboard_core::error::CoreError;
use eduboard_core::slug::{base_slug, with_suffix, MAX_SLUG_ATTEMPTS};

use crate::error::RepoResult;
use crate::store::{Collection, DocumentStore};

/// Derive a slug from `candidate` that is free in `collection` right now.
///
/// Tries `base`, `base-1`, `base-2`, ... and gives up with a conflict after
/// [`MAX_SLUG_ATTEMPTS`] attempts. A concurrent writer can still take the
/// returned slug first; the unique index then rejects the later insert.
pub async fn assign_slug(
    store: &dyn DocumentStore,
    collection: Collection,
    candidate: &str,
) -> RepoResult<String> {
    let base = base_slug(candidate, collection.slug_fallback());

    for attempt in 0..MAX_SLUG_ATTEMPTS {
        let slug = with_suffix(&base, attempt);
        if !store.slug_exists(collection, &slug).await? {
            return Ok(slug);
        }
    }

    Err(CoreError::Conflict(format!(
        "No free slug for '{base}' in {} after {MAX_SLUG_ATTEMPTS} attempts",
        collection.table()
    ))
    .into())
}
