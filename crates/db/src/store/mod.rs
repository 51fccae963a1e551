//! The document store seam.
//!
//! Every entity collection shares one physical shape: engine-managed columns
//! (id, slug, sequence, email, owner, timestamps, soft-delete marker) plus a
//! JSON body. [`DocumentStore`] is the contract both backends implement;
//! [`OutboxStore`] backs durable notification delivery.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use eduboard_core::filter::{FilterSpec, SortSpec};
use eduboard_core::types::{DbId, ObjectId, Timestamp};

use crate::models::counter::CounterValue;
use crate::models::outbox::{NewOutboxMessage, OutboxMessage, OutboxStatus};

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// The document collections of the job board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Teachers,
    NonTeachers,
    Coaching,
    Schools,
    Vacancies,
    Applications,
    ParentProfiles,
    StudentProfiles,
    HomeTuitions,
}

impl Collection {
    pub const ALL: [Collection; 9] = [
        Collection::Teachers,
        Collection::NonTeachers,
        Collection::Coaching,
        Collection::Schools,
        Collection::Vacancies,
        Collection::Applications,
        Collection::ParentProfiles,
        Collection::StudentProfiles,
        Collection::HomeTuitions,
    ];

    /// Backing table name. Also the counter name used for sequences.
    pub fn table(self) -> &'static str {
        match self {
            Collection::Teachers => "teachers",
            Collection::NonTeachers => "non_teachers",
            Collection::Coaching => "coaching_institutes",
            Collection::Schools => "schools",
            Collection::Vacancies => "vacancies",
            Collection::Applications => "applications",
            Collection::ParentProfiles => "parent_profiles",
            Collection::StudentProfiles => "student_profiles",
            Collection::HomeTuitions => "home_tuitions",
        }
    }

    /// Human-readable singular name used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            Collection::Teachers => "Teacher",
            Collection::NonTeachers => "NonTeacher",
            Collection::Coaching => "Coaching",
            Collection::Schools => "School",
            Collection::Vacancies => "Vacancy",
            Collection::Applications => "Application",
            Collection::ParentProfiles => "ParentProfile",
            Collection::StudentProfiles => "StudentProfile",
            Collection::HomeTuitions => "HomeTuition",
        }
    }

    /// Slug used when a candidate normalizes to nothing.
    pub fn slug_fallback(self) -> &'static str {
        match self {
            Collection::Teachers => "teacher",
            Collection::NonTeachers => "staff",
            Collection::Coaching => "coaching",
            Collection::Schools => "school",
            Collection::Vacancies => "vacancy",
            Collection::Applications => "application",
            Collection::ParentProfiles => "parent",
            Collection::StudentProfiles => "student",
            Collection::HomeTuitions => "tuition",
        }
    }

    /// Whether email addresses must be unique (case-insensitively) in this collection.
    pub fn unique_email(self) -> bool {
        matches!(
            self,
            Collection::Teachers
                | Collection::NonTeachers
                | Collection::Coaching
                | Collection::Schools
                | Collection::ParentProfiles
                | Collection::StudentProfiles
        )
    }
}

// ---------------------------------------------------------------------------
// Stored documents
// ---------------------------------------------------------------------------

/// A document as the store sees it: managed columns plus an opaque body.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: ObjectId,
    pub slug: Option<String>,
    pub sequence: Option<i64>,
    /// Copy of the body's email, kept for uniqueness checks and indexing.
    pub email: Option<String>,
    pub owner_id: Option<String>,
    pub body: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique key (slug or email) is already taken.
    #[error("Duplicate {field} in {collection}")]
    Duplicate {
        collection: &'static str,
        field: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row could not be mapped back to a document.
    #[error("Corrupt document: {0}")]
    Corrupt(String),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Storage operations over document collections.
///
/// Soft-deleted documents are invisible to every read and are never
/// considered for uniqueness.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document. Fails with [`StoreError::Duplicate`] when the
    /// slug or (for unique-email collections) the email is taken.
    async fn insert(&self, collection: Collection, doc: &StoredDocument)
        -> Result<(), StoreError>;

    async fn find_by_id(
        &self,
        collection: Collection,
        id: &ObjectId,
    ) -> Result<Option<StoredDocument>, StoreError>;

    async fn find_by_slug(
        &self,
        collection: Collection,
        slug: &str,
    ) -> Result<Option<StoredDocument>, StoreError>;

    /// Every live document, oldest first (ties on id).
    async fn find_all(&self, collection: Collection) -> Result<Vec<StoredDocument>, StoreError>;

    /// The live documents among `ids`, in no particular order.
    async fn find_many(
        &self,
        collection: Collection,
        ids: &[ObjectId],
    ) -> Result<Vec<StoredDocument>, StoreError>;

    async fn slug_exists(&self, collection: Collection, slug: &str) -> Result<bool, StoreError>;

    /// Case-insensitive email match, optionally ignoring one document.
    async fn email_taken(
        &self,
        collection: Collection,
        email: &str,
        exclude: Option<&ObjectId>,
    ) -> Result<bool, StoreError>;

    async fn max_sequence(&self, collection: Collection) -> Result<Option<i64>, StoreError>;

    /// Atomically advance the named counter to `max(current, floor) + 1`
    /// and return the new value.
    async fn next_counter(&self, name: &str, floor: i64) -> Result<i64, StoreError>;

    async fn counters(&self) -> Result<Vec<CounterValue>, StoreError>;

    async fn count(&self, collection: Collection, filter: &FilterSpec) -> Result<i64, StoreError>;

    async fn find_page(
        &self,
        collection: Collection,
        filter: &FilterSpec,
        sort: SortSpec,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<StoredDocument>, StoreError>;

    /// Replace body and email of an existing document and bump `updated_at`.
    /// Slug, sequence, owner and `created_at` are left untouched.
    async fn replace(
        &self,
        collection: Collection,
        doc: &StoredDocument,
    ) -> Result<bool, StoreError>;

    /// Bulk-set sequence values. Returns the number of documents updated.
    async fn assign_sequences(
        &self,
        collection: Collection,
        assignments: &[(ObjectId, i64)],
    ) -> Result<u64, StoreError>;

    async fn soft_delete(&self, collection: Collection, id: &ObjectId)
        -> Result<bool, StoreError>;

    /// Permanently remove documents created before `cutoff`.
    async fn purge_created_before(
        &self,
        collection: Collection,
        cutoff: Timestamp,
    ) -> Result<u64, StoreError>;

    /// Every non-empty email stored in the collection.
    async fn emails(&self, collection: Collection) -> Result<Vec<String>, StoreError>;

    /// Cheap reachability check for health endpoints.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Durable queue of outgoing notifications.
///
/// Messages move `pending -> in_flight -> sent`, or back to `pending` with a
/// later `next_attempt_at` after a failure, or to `dead` once retries are
/// exhausted. An `in_flight` message whose lease expired is claimable again,
/// which makes delivery at-least-once.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    async fn enqueue(&self, message: &NewOutboxMessage) -> Result<OutboxMessage, StoreError>;

    /// Claim up to `limit` due messages, bumping their attempt count and
    /// leasing them until `now + lease`.
    async fn claim_due(
        &self,
        now: Timestamp,
        limit: i64,
        lease: chrono::Duration,
    ) -> Result<Vec<OutboxMessage>, StoreError>;

    async fn mark_sent(&self, id: DbId) -> Result<(), StoreError>;

    /// Record a failure. `retry_at = None` marks the message dead.
    async fn mark_failed(
        &self,
        id: DbId,
        error: &str,
        retry_at: Option<Timestamp>,
    ) -> Result<(), StoreError>;

    async fn find_message(&self, id: DbId) -> Result<Option<OutboxMessage>, StoreError>;

    /// Newest first.
    async fn list_messages(
        &self,
        status: Option<OutboxStatus>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<OutboxMessage>, StoreError>;

    async fn count_messages(&self, status: Option<OutboxStatus>) -> Result<i64, StoreError>;

    /// Move a dead message back to `pending` with a fresh attempt budget.
    async fn requeue(&self, id: DbId) -> Result<bool, StoreError>;
}
