//! In-memory implementation of [`DocumentStore`] and [`OutboxStore`].
//!
//! Backs the test suites and `STORE_BACKEND=memory`. Semantics mirror the
//! Postgres store: soft-deleted rows are invisible, slug and (for unique-email
//! collections) case-insensitive email uniqueness are enforced on insert, and
//! filters are evaluated with [`FilterSpec::matches`].

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use eduboard_core::filter::{FilterSpec, SortKey, SortSpec};
use eduboard_core::types::{DbId, ObjectId, Timestamp};

use super::{Collection, DocumentStore, OutboxStore, StoreError, StoredDocument};
use crate::models::counter::CounterValue;
use crate::models::outbox::{NewOutboxMessage, OutboxMessage, OutboxStatus};

#[derive(Debug, Clone)]
struct Row {
    doc: StoredDocument,
    deleted_at: Option<Timestamp>,
}

impl Row {
    fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Default)]
struct State {
    collections: HashMap<Collection, Vec<Row>>,
    counters: BTreeMap<String, i64>,
    outbox: Vec<OutboxMessage>,
    next_outbox_id: DbId,
}

impl State {
    fn live(&self, collection: Collection) -> impl Iterator<Item = &StoredDocument> {
        self.collections
            .get(&collection)
            .into_iter()
            .flatten()
            .filter(|row| row.is_live())
            .map(|row| &row.doc)
    }

    fn live_mut(&mut self, collection: Collection, id: &ObjectId) -> Option<&mut Row> {
        self.collections
            .get_mut(&collection)?
            .iter_mut()
            .find(|row| row.is_live() && row.doc.id == *id)
    }

    fn message_mut(&mut self, id: DbId) -> Option<&mut OutboxMessage> {
        self.outbox.iter_mut().find(|m| m.id == id)
    }
}

/// Process-local document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_matches(stored: Option<&str>, email: &str) -> bool {
    stored.is_some_and(|s| s.to_lowercase() == email.to_lowercase())
}

/// Ascending comparison for `sort.key`. Missing sequences sort last, as
/// Postgres does for NULLs in ascending order.
fn compare(a: &StoredDocument, b: &StoredDocument, key: SortKey) -> Ordering {
    let primary = match key {
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        SortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortKey::Sequence => a
            .sequence
            .unwrap_or(i64::MAX)
            .cmp(&b.sequence.unwrap_or(i64::MAX)),
    };
    primary.then_with(|| a.id.as_str().cmp(b.id.as_str()))
}

fn sorted(mut docs: Vec<StoredDocument>, sort: SortSpec) -> Vec<StoredDocument> {
    docs.sort_by(|a, b| {
        let ord = compare(a, b, sort.key);
        if sort.descending {
            ord.reverse()
        } else {
            ord
        }
    });
    docs
}

// ---------------------------------------------------------------------------
// DocumentStore
// ---------------------------------------------------------------------------

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(
        &self,
        collection: Collection,
        doc: &StoredDocument,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;

        let duplicate = |field: &str| StoreError::Duplicate {
            collection: collection.label(),
            field: field.to_string(),
        };

        for existing in state.live(collection) {
            if existing.id == doc.id {
                return Err(duplicate("id"));
            }
            if doc.slug.is_some() && existing.slug == doc.slug {
                return Err(duplicate("slug"));
            }
            if collection.unique_email() {
                if let Some(email) = doc.email.as_deref() {
                    if email_matches(existing.email.as_deref(), email) {
                        return Err(duplicate("email"));
                    }
                }
            }
        }

        state
            .collections
            .entry(collection)
            .or_default()
            .push(Row {
                doc: doc.clone(),
                deleted_at: None,
            });
        Ok(())
    }

    async fn find_by_id(
        &self,
        collection: Collection,
        id: &ObjectId,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let state = self.state.read().await;
        let found = state.live(collection).find(|d| d.id == *id).cloned();
        Ok(found)
    }

    async fn find_by_slug(
        &self,
        collection: Collection,
        slug: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let state = self.state.read().await;
        let found = state
            .live(collection)
            .find(|d| d.slug.as_deref() == Some(slug))
            .cloned();
        Ok(found)
    }

    async fn find_all(&self, collection: Collection) -> Result<Vec<StoredDocument>, StoreError> {
        let state = self.state.read().await;
        let docs = state.live(collection).cloned().collect();
        Ok(sorted(
            docs,
            SortSpec {
                key: SortKey::CreatedAt,
                descending: false,
            },
        ))
    }

    async fn find_many(
        &self,
        collection: Collection,
        ids: &[ObjectId],
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let state = self.state.read().await;
        let found = state
            .live(collection)
            .filter(|d| ids.contains(&d.id))
            .cloned()
            .collect();
        Ok(found)
    }

    async fn slug_exists(&self, collection: Collection, slug: &str) -> Result<bool, StoreError> {
        let state = self.state.read().await;
        let exists = state
            .live(collection)
            .any(|d| d.slug.as_deref() == Some(slug));
        Ok(exists)
    }

    async fn email_taken(
        &self,
        collection: Collection,
        email: &str,
        exclude: Option<&ObjectId>,
    ) -> Result<bool, StoreError> {
        let state = self.state.read().await;
        let taken = state.live(collection).any(|d| {
            Some(&d.id) != exclude && email_matches(d.email.as_deref(), email)
        });
        Ok(taken)
    }

    async fn max_sequence(&self, collection: Collection) -> Result<Option<i64>, StoreError> {
        let state = self.state.read().await;
        let max = state.live(collection).filter_map(|d| d.sequence).max();
        Ok(max)
    }

    async fn next_counter(&self, name: &str, floor: i64) -> Result<i64, StoreError> {
        let mut state = self.state.write().await;
        let value = state.counters.entry(name.to_string()).or_insert(0);
        *value = (*value).max(floor) + 1;
        Ok(*value)
    }

    async fn counters(&self) -> Result<Vec<CounterValue>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .counters
            .iter()
            .map(|(name, value)| CounterValue {
                name: name.clone(),
                value: *value,
            })
            .collect())
    }

    async fn count(&self, collection: Collection, filter: &FilterSpec) -> Result<i64, StoreError> {
        let state = self.state.read().await;
        let count = state
            .live(collection)
            .filter(|d| filter.matches(&d.body, d.owner_id.as_deref()))
            .count();
        Ok(count as i64)
    }

    async fn find_page(
        &self,
        collection: Collection,
        filter: &FilterSpec,
        sort: SortSpec,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let state = self.state.read().await;
        let matching = state
            .live(collection)
            .filter(|d| filter.matches(&d.body, d.owner_id.as_deref()))
            .cloned()
            .collect();
        Ok(sorted(matching, sort)
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn replace(
        &self,
        collection: Collection,
        doc: &StoredDocument,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;

        if collection.unique_email() {
            if let Some(email) = doc.email.as_deref() {
                let clash = state
                    .live(collection)
                    .any(|d| d.id != doc.id && email_matches(d.email.as_deref(), email));
                if clash {
                    return Err(StoreError::Duplicate {
                        collection: collection.label(),
                        field: "email".to_string(),
                    });
                }
            }
        }

        match state.live_mut(collection, &doc.id) {
            Some(row) => {
                row.doc.body = doc.body.clone();
                row.doc.email = doc.email.clone();
                row.doc.updated_at = doc.updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn assign_sequences(
        &self,
        collection: Collection,
        assignments: &[(ObjectId, i64)],
    ) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let mut updated = 0;
        for (id, sequence) in assignments {
            if let Some(row) = state.live_mut(collection, id) {
                row.doc.sequence = Some(*sequence);
                row.doc.updated_at = now;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn soft_delete(
        &self,
        collection: Collection,
        id: &ObjectId,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        match state.live_mut(collection, id) {
            Some(row) => {
                row.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn purge_created_before(
        &self,
        collection: Collection,
        cutoff: Timestamp,
    ) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        let Some(rows) = state.collections.get_mut(&collection) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| row.doc.created_at >= cutoff);
        Ok((before - rows.len()) as u64)
    }

    async fn emails(&self, collection: Collection) -> Result<Vec<String>, StoreError> {
        let state = self.state.read().await;
        let mut docs: Vec<&StoredDocument> = state.live(collection).collect();
        docs.sort_by(|a, b| compare(a, b, SortKey::CreatedAt));
        Ok(docs
            .into_iter()
            .filter_map(|d| d.email.clone())
            .filter(|e| !e.is_empty())
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// OutboxStore
// ---------------------------------------------------------------------------

#[async_trait]
impl OutboxStore for MemoryStore {
    async fn enqueue(&self, message: &NewOutboxMessage) -> Result<OutboxMessage, StoreError> {
        let mut state = self.state.write().await;
        state.next_outbox_id += 1;
        let now = Utc::now();
        let row = OutboxMessage {
            id: state.next_outbox_id,
            kind: message.kind.clone(),
            payload: message.payload.clone(),
            status: OutboxStatus::Pending.as_str().to_string(),
            attempts: 0,
            max_attempts: message.max_attempts,
            last_error: None,
            next_attempt_at: now,
            created_at: now,
            updated_at: now,
            sent_at: None,
        };
        state.outbox.push(row.clone());
        Ok(row)
    }

    async fn claim_due(
        &self,
        now: Timestamp,
        limit: i64,
        lease: chrono::Duration,
    ) -> Result<Vec<OutboxMessage>, StoreError> {
        let mut state = self.state.write().await;

        let mut due: Vec<&mut OutboxMessage> = state
            .outbox
            .iter_mut()
            .filter(|m| {
                matches!(m.status(), Some(OutboxStatus::Pending | OutboxStatus::InFlight))
                    && m.next_attempt_at <= now
            })
            .collect();
        due.sort_by_key(|m| (m.next_attempt_at, m.id));

        let mut claimed: Vec<OutboxMessage> = due
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|m| {
                m.status = OutboxStatus::InFlight.as_str().to_string();
                m.attempts += 1;
                m.next_attempt_at = now + lease;
                m.updated_at = now;
                m.clone()
            })
            .collect();
        claimed.sort_by_key(|m| m.id);
        Ok(claimed)
    }

    async fn mark_sent(&self, id: DbId) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if let Some(m) = state.message_mut(id) {
            let now = Utc::now();
            m.status = OutboxStatus::Sent.as_str().to_string();
            m.sent_at = Some(now);
            m.updated_at = now;
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: DbId,
        error: &str,
        retry_at: Option<Timestamp>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if let Some(m) = state.message_mut(id) {
            m.last_error = Some(error.to_string());
            m.updated_at = Utc::now();
            match retry_at {
                Some(at) => {
                    m.status = OutboxStatus::Pending.as_str().to_string();
                    m.next_attempt_at = at;
                }
                None => m.status = OutboxStatus::Dead.as_str().to_string(),
            }
        }
        Ok(())
    }

    async fn find_message(&self, id: DbId) -> Result<Option<OutboxMessage>, StoreError> {
        let state = self.state.read().await;
        Ok(state.outbox.iter().find(|m| m.id == id).cloned())
    }

    async fn list_messages(
        &self,
        status: Option<OutboxStatus>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<OutboxMessage>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .outbox
            .iter()
            .rev()
            .filter(|m| status.is_none() || m.status() == status)
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count_messages(&self, status: Option<OutboxStatus>) -> Result<i64, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .outbox
            .iter()
            .filter(|m| status.is_none() || m.status() == status)
            .count() as i64)
    }

    async fn requeue(&self, id: DbId) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        match state.message_mut(id) {
            Some(m) if m.status() == Some(OutboxStatus::Dead) => {
                let now = Utc::now();
                m.status = OutboxStatus::Pending.as_str().to_string();
                m.attempts = 0;
                m.next_attempt_at = now;
                m.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn doc(slug: &str, email: &str) -> StoredDocument {
        let now = Utc::now();
        StoredDocument {
            id: ObjectId::new(),
            slug: Some(slug.to_string()),
            sequence: None,
            email: Some(email.to_string()),
            owner_id: None,
            body: json!({ "email": email }),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_email_case_insensitively() {
        let store = MemoryStore::new();
        store
            .insert(Collection::Teachers, &doc("a", "a@x.com"))
            .await
            .unwrap();

        let err = store
            .insert(Collection::Teachers, &doc("b", "A@X.com"))
            .await
            .unwrap_err();
        assert_matches!(err, StoreError::Duplicate { ref field, .. } if field == "email");
    }

    #[tokio::test]
    async fn email_uniqueness_is_per_collection_kind() {
        let store = MemoryStore::new();
        store
            .insert(Collection::Vacancies, &doc("a", "hr@x.com"))
            .await
            .unwrap();
        store
            .insert(Collection::Vacancies, &doc("b", "hr@x.com"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn soft_deleted_rows_free_their_keys() {
        let store = MemoryStore::new();
        let first = doc("a", "a@x.com");
        store.insert(Collection::Teachers, &first).await.unwrap();
        assert!(store.soft_delete(Collection::Teachers, &first.id).await.unwrap());

        assert!(store
            .find_by_id(Collection::Teachers, &first.id)
            .await
            .unwrap()
            .is_none());
        store
            .insert(Collection::Teachers, &doc("a", "a@x.com"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn lookups_see_only_live_rows() {
        let store = MemoryStore::new();
        let mut kept = doc("asha-rao", "asha@x.com");
        kept.sequence = Some(4);
        let mut gone = doc("ravi", "ravi@x.com");
        gone.sequence = Some(9);
        store.insert(Collection::Teachers, &kept).await.unwrap();
        store.insert(Collection::Teachers, &gone).await.unwrap();
        store.soft_delete(Collection::Teachers, &gone.id).await.unwrap();

        let by_id = store.find_by_id(Collection::Teachers, &kept.id).await.unwrap();
        assert_eq!(by_id.map(|d| d.id), Some(kept.id.clone()));
        let by_slug = store.find_by_slug(Collection::Teachers, "asha-rao").await.unwrap();
        assert_eq!(by_slug.map(|d| d.id), Some(kept.id.clone()));
        assert!(store.find_by_slug(Collection::Teachers, "ravi").await.unwrap().is_none());

        let many = store
            .find_many(Collection::Teachers, &[kept.id.clone(), gone.id.clone()])
            .await
            .unwrap();
        assert_eq!(many.len(), 1);

        assert!(store.slug_exists(Collection::Teachers, "asha-rao").await.unwrap());
        assert!(!store.slug_exists(Collection::Teachers, "ravi").await.unwrap());

        assert!(store
            .email_taken(Collection::Teachers, "ASHA@x.com", None)
            .await
            .unwrap());
        assert!(!store
            .email_taken(Collection::Teachers, "asha@x.com", Some(&kept.id))
            .await
            .unwrap());
        assert!(!store
            .email_taken(Collection::Teachers, "ravi@x.com", None)
            .await
            .unwrap());

        assert_eq!(store.max_sequence(Collection::Teachers).await.unwrap(), Some(4));
    }

    #[tokio::test]
    async fn counter_respects_floor() {
        let store = MemoryStore::new();
        assert_eq!(store.next_counter("teachers", 0).await.unwrap(), 1);
        assert_eq!(store.next_counter("teachers", 0).await.unwrap(), 2);
        assert_eq!(store.next_counter("teachers", 10).await.unwrap(), 11);
    }

    #[tokio::test]
    async fn claim_skips_leased_messages_until_expiry() {
        let store = MemoryStore::new();
        store
            .enqueue(&NewOutboxMessage::new("email_batch", json!({})))
            .await
            .unwrap();

        let now = Utc::now();
        let lease = chrono::Duration::seconds(60);
        let claimed = store.claim_due(now, 10, lease).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].attempts, 1);
        assert!(store.claim_due(now, 10, lease).await.unwrap().is_empty());

        let later = now + chrono::Duration::seconds(61);
        let reclaimed = store.claim_due(later, 10, lease).await.unwrap();
        assert_eq!(reclaimed[0].attempts, 2);
    }

    #[tokio::test]
    async fn requeue_only_revives_dead_messages() {
        let store = MemoryStore::new();
        let msg = store
            .enqueue(&NewOutboxMessage::new("email_batch", json!({})))
            .await
            .unwrap();
        assert!(!store.requeue(msg.id).await.unwrap());

        store.mark_failed(msg.id, "smtp down", None).await.unwrap();
        assert_eq!(
            store.count_messages(Some(OutboxStatus::Dead)).await.unwrap(),
            1
        );
        assert!(store.requeue(msg.id).await.unwrap());
        let revived = store.find_message(msg.id).await.unwrap().unwrap();
        assert_eq!(revived.status(), Some(OutboxStatus::Pending));
        assert_eq!(revived.attempts, 0);
    }
}
