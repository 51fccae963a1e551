//! Generic repository over one document collection.
//!
//! Every entity shares the same lifecycle: create (with email uniqueness,
//! slug and sequence assignment), resolve by canonical id / short id / slug,
//! filtered listing, replace and merge-patch, soft delete, and reorder.

use std::collections::HashSet;
use std::marker::PhantomData;

use chrono::Utc;
use serde_json::Value;
use eduboard_core::error::CoreError;
use eduboard_core::filter::{FilterSpec, SortSpec};
use eduboard_core::pagination::{Page, PageRequest, Pagination};
use eduboard_core::short_id::{scan_suffix, LookupKey};
use eduboard_core::types::ObjectId;
use eduboard_core::validation::validate;

use super::sequence::{fresh_sequences, next_sequence, plan_reorder, reusable_slots, SequenceStrategy};
use super::slug::assign_slug;
use crate::error::RepoResult;
use crate::models::{Document, Record};
use crate::store::{DocumentStore, StoredDocument};

/// Provides the shared document lifecycle for entity type `T`.
pub struct CollectionRepo<T>(PhantomData<T>);

impl<T: Document> CollectionRepo<T> {
    /// Validate and insert a new document owned by `owner_id`.
    pub async fn create(
        store: &dyn DocumentStore,
        mut input: T,
        owner_id: Option<&str>,
        strategy: SequenceStrategy,
    ) -> RepoResult<Record<T>> {
        let collection = T::COLLECTION;
        input.normalize();
        validate(&input)?;
        Self::ensure_email_free(store, &input, None).await?;

        let slug = match input.slug_candidate() {
            Some(candidate) => Some(assign_slug(store, collection, &candidate).await?),
            None => None,
        };
        let sequence = if T::SEQUENCED {
            Some(next_sequence(store, collection, strategy).await?)
        } else {
            None
        };

        let now = Utc::now();
        let doc = StoredDocument {
            id: ObjectId::generate_at(now),
            slug,
            sequence,
            email: input.email().map(str::to_string),
            owner_id: owner_id.map(str::to_string),
            body: serde_json::to_value(&input).map_err(crate::StoreError::from)?,
            created_at: now,
            updated_at: now,
        };
        store.insert(collection, &doc).await?;

        tracing::debug!(
            collection = collection.table(),
            id = %doc.id,
            slug = ?doc.slug,
            sequence = ?doc.sequence,
            "Document created",
        );
        Ok(Record::from_stored(doc)?)
    }

    /// Look up a record by canonical id, short id or slug.
    ///
    /// Canonical ids are tried directly; canonical ids that miss and 6-hex
    /// short ids fall back to a linear suffix scan over every live record in
    /// creation order. Anything else, or a short id with no match, is tried
    /// as a slug.
    pub async fn find(store: &dyn DocumentStore, key: &str) -> RepoResult<Option<Record<T>>> {
        let collection = T::COLLECTION;
        let lookup = LookupKey::classify(key);

        if let LookupKey::Canonical(id) = &lookup {
            if let Some(doc) = store.find_by_id(collection, id).await? {
                return Ok(Some(Record::from_stored(doc)?));
            }
        }

        let doc = match lookup.scan_suffix() {
            Some(suffix) => {
                let candidates = store.find_all(collection).await?;
                let scan = scan_suffix(candidates, suffix, |doc| doc.id.as_str());
                if scan.matches > 1 {
                    tracing::warn!(
                        collection = collection.table(),
                        suffix,
                        matches = scan.matches,
                        "Ambiguous short id, using the oldest match",
                    );
                }
                scan.first
            }
            None => None,
        };

        let doc = match (doc, &lookup) {
            (Some(doc), _) => Some(doc),
            (None, LookupKey::Short(slug) | LookupKey::Slug(slug)) => {
                store.find_by_slug(collection, slug).await?
            }
            (None, _) => None,
        };

        Ok(doc.map(Record::from_stored).transpose()?)
    }

    /// Like [`find`](Self::find) but a miss is a `NotFound` error.
    pub async fn resolve(store: &dyn DocumentStore, key: &str) -> RepoResult<Record<T>> {
        Self::find(store, key)
            .await?
            .ok_or_else(|| CoreError::not_found(T::COLLECTION.label(), key.trim()).into())
    }

    /// One page of records matching `filter`. Count and slice run concurrently.
    pub async fn list(
        store: &dyn DocumentStore,
        filter: &FilterSpec,
        sort: SortSpec,
        page: PageRequest,
    ) -> RepoResult<Page<Record<T>>> {
        let collection = T::COLLECTION;
        filter.validate(T::FILTER_FIELDS)?;

        let (total, docs) = tokio::try_join!(
            store.count(collection, filter),
            store.find_page(collection, filter, sort, page.skip(), page.limit),
        )?;

        let items = docs
            .into_iter()
            .map(Record::from_stored)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            pagination: Pagination::new(total, page),
        })
    }

    /// Replace the body of `existing` with `input`. Slug, sequence, owner and
    /// server-controlled fields are kept.
    pub async fn replace(
        store: &dyn DocumentStore,
        existing: &Record<T>,
        mut input: T,
    ) -> RepoResult<Record<T>> {
        input.normalize();
        input.retain_managed(&existing.body);
        validate(&input)?;
        Self::ensure_email_free(store, &input, Some(&existing.id)).await?;
        Self::write(store, existing, input).await
    }

    /// Persist a server-side change to `existing` (status transitions and
    /// similar). Unlike [`replace`](Self::replace), managed fields are taken
    /// from `body` as given.
    pub async fn update_managed(
        store: &dyn DocumentStore,
        existing: &Record<T>,
        mut body: T,
    ) -> RepoResult<Record<T>> {
        body.normalize();
        validate(&body)?;
        Self::write(store, existing, body).await
    }

    async fn write(
        store: &dyn DocumentStore,
        existing: &Record<T>,
        input: T,
    ) -> RepoResult<Record<T>> {
        let doc = StoredDocument {
            id: existing.id.clone(),
            slug: existing.slug.clone(),
            sequence: existing.sequence,
            email: input.email().map(str::to_string),
            owner_id: existing.owner_id.clone(),
            body: serde_json::to_value(&input).map_err(crate::StoreError::from)?,
            created_at: existing.created_at,
            updated_at: Utc::now(),
        };

        if !store.replace(T::COLLECTION, &doc).await? {
            return Err(CoreError::not_found(T::COLLECTION.label(), &existing.id).into());
        }
        Ok(Record::from_stored(doc)?)
    }

    /// Merge `patch` into the body of `existing`: top-level keys overwrite,
    /// `null` removes a key. The result must still be a valid body.
    pub async fn patch(
        store: &dyn DocumentStore,
        existing: &Record<T>,
        patch: &Value,
    ) -> RepoResult<Record<T>> {
        let Value::Object(changes) = patch else {
            return Err(CoreError::Validation("Patch body must be a JSON object".into()).into());
        };

        let mut body = serde_json::to_value(&existing.body).map_err(crate::StoreError::from)?;
        if let Value::Object(fields) = &mut body {
            for (key, value) in changes {
                if value.is_null() {
                    fields.remove(key);
                } else {
                    fields.insert(key.clone(), value.clone());
                }
            }
        }

        let merged: T = serde_json::from_value(body)
            .map_err(|e| CoreError::Validation(format!("Invalid patch: {e}")))?;
        Self::replace(store, existing, merged).await
    }

    /// Soft-delete the record with `id`.
    pub async fn delete(store: &dyn DocumentStore, id: &ObjectId) -> RepoResult<()> {
        if !store.soft_delete(T::COLLECTION, id).await? {
            return Err(CoreError::not_found(T::COLLECTION.label(), id).into());
        }
        tracing::debug!(collection = T::COLLECTION.table(), id = %id, "Document soft-deleted");
        Ok(())
    }

    /// Reassign sequences so that listing by sequence yields `ordered_ids`.
    ///
    /// The listed records keep the set of sequence values they already hold;
    /// records without a sequence draw fresh values first.
    pub async fn reorder(
        store: &dyn DocumentStore,
        ordered_ids: &[String],
        strategy: SequenceStrategy,
    ) -> RepoResult<Vec<(ObjectId, i64)>> {
        let collection = T::COLLECTION;
        if !T::SEQUENCED {
            return Err(CoreError::Validation(format!(
                "{} records have no display sequence",
                collection.label()
            ))
            .into());
        }
        if ordered_ids.is_empty() {
            return Err(CoreError::Validation("ordered_ids must not be empty".into()).into());
        }

        let mut ids = Vec::with_capacity(ordered_ids.len());
        let mut seen = HashSet::with_capacity(ordered_ids.len());
        for raw in ordered_ids {
            let id: ObjectId = raw.parse()?;
            if !seen.insert(id.clone()) {
                return Err(CoreError::Validation(format!("Duplicate id '{id}' in ordered_ids")).into());
            }
            ids.push(id);
        }

        let found = store.find_many(collection, &ids).await?;
        if let Some(missing) = ids.iter().find(|id| !found.iter().any(|d| &d.id == *id)) {
            return Err(CoreError::not_found(collection.label(), missing).into());
        }

        let held: Vec<Option<i64>> = found.iter().map(|d| d.sequence).collect();
        let (mut slots, missing) = reusable_slots(&held);
        if missing > 0 {
            slots.extend(fresh_sequences(store, collection, strategy, missing).await?);
        }

        let plan = plan_reorder(&ids, slots);
        let updated = store.assign_sequences(collection, &plan).await?;
        tracing::debug!(
            collection = collection.table(),
            requested = plan.len(),
            updated,
            "Sequences reassigned",
        );
        Ok(plan)
    }

    async fn ensure_email_free(
        store: &dyn DocumentStore,
        input: &T,
        exclude: Option<&ObjectId>,
    ) -> RepoResult<()> {
        let collection = T::COLLECTION;
        if !collection.unique_email() {
            return Ok(());
        }
        if let Some(email) = input.email() {
            if store.email_taken(collection, email, exclude).await? {
                return Err(CoreError::Conflict(format!(
                    "A {} with email '{email}' already exists",
                    collection.label()
                ))
                .into());
            }
        }
        Ok(())
    }
}
