//! PostgreSQL implementation of [`DocumentStore`] and [`OutboxStore`].
//!
//! Each collection is its own table with the same column layout (see
//! `migrations/`). Document bodies live in a JSONB `doc` column; list filters
//! are translated into SQL over that column with bound parameters only.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use eduboard_core::filter::{escape_like, FieldRef, FilterSpec, Matcher, SortKey, SortSpec};
use eduboard_core::types::{DbId, ObjectId, Timestamp};

use super::{Collection, DocumentStore, OutboxStore, StoreError, StoredDocument};
use crate::models::counter::CounterValue;
use crate::models::outbox::{NewOutboxMessage, OutboxMessage, OutboxStatus};

/// Column list for collection queries.
const COLUMNS: &str = "id, slug, sequence, email, owner_id, doc, created_at, updated_at";

/// Column list for notification_outbox queries.
const OUTBOX_COLUMNS: &str = "id, kind, payload, status, attempts, max_attempts, last_error, \
    next_attempt_at, created_at, updated_at, sent_at";

/// Document store backed by a Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: String,
    slug: Option<String>,
    sequence: Option<i64>,
    email: Option<String>,
    owner_id: Option<String>,
    doc: serde_json::Value,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl TryFrom<DocumentRow> for StoredDocument {
    type Error = StoreError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let id = ObjectId::parse(&row.id)
            .ok_or_else(|| StoreError::Corrupt(format!("malformed id '{}'", row.id)))?;
        Ok(StoredDocument {
            id,
            slug: row.slug,
            sequence: row.sequence,
            email: row.email,
            owner_id: row.owner_id,
            body: row.doc,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_documents(rows: Vec<DocumentRow>) -> Result<Vec<StoredDocument>, StoreError> {
    rows.into_iter().map(StoredDocument::try_from).collect()
}

/// Translate unique violations on `uq_<table>_<field>` constraints into
/// [`StoreError::Duplicate`].
fn classify_write_error(collection: Collection, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        // PostgreSQL unique constraint violation: error code 23505
        if db_err.code().as_deref() == Some("23505") {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let prefix = format!("uq_{}_", collection.table());
            let field = match constraint.strip_prefix(&prefix) {
                Some(field) => field.to_string(),
                None if constraint.ends_with("_pkey") => "id".to_string(),
                None => constraint.to_string(),
            };
            return StoreError::Duplicate {
                collection: collection.label(),
                field,
            };
        }
    }
    StoreError::Database(err)
}

// ---------------------------------------------------------------------------
// Filter translation
// ---------------------------------------------------------------------------

/// A value bound into a dynamically built query.
#[derive(Debug, Clone, PartialEq)]
enum BindValue {
    Text(String),
    Bool(bool),
}

/// Build a `WHERE` clause for `filter`, numbering placeholders from
/// `bind_idx`. Returns the clause, its bind values in order, and the next
/// free placeholder index.
fn build_where(filter: &FilterSpec, mut bind_idx: u32) -> (String, Vec<BindValue>, u32) {
    let mut conditions = vec!["deleted_at IS NULL".to_string()];
    let mut binds = Vec::new();

    for condition in filter.conditions() {
        match condition.field {
            FieldRef::Owner => {
                let value = match &condition.matcher {
                    Matcher::Equals(v) | Matcher::EqualsIgnoreCase(v) | Matcher::Contains(v) => {
                        v.clone()
                    }
                    Matcher::Flag(b) => b.to_string(),
                };
                conditions.push(format!("owner_id = ${bind_idx}"));
                binds.push(BindValue::Text(value));
                bind_idx += 1;
            }
            FieldRef::Body(field) => {
                let key_idx = bind_idx;
                let value_idx = bind_idx + 1;
                binds.push(BindValue::Text(field.to_string()));
                bind_idx += 2;

                let (comparison, value) = match &condition.matcher {
                    Matcher::Flag(flag) => {
                        binds.push(BindValue::Bool(*flag));
                        conditions.push(format!(
                            "doc -> ${key_idx} = to_jsonb(${value_idx}::boolean)"
                        ));
                        continue;
                    }
                    Matcher::Equals(v) => (format!("v.val = ${value_idx}"), v.clone()),
                    Matcher::EqualsIgnoreCase(v) => {
                        (format!("lower(v.val) = lower(${value_idx})"), v.clone())
                    }
                    Matcher::Contains(v) => (
                        format!("v.val ILIKE ${value_idx} ESCAPE '\\'"),
                        format!("%{}%", escape_like(v)),
                    ),
                };
                binds.push(BindValue::Text(value));
                // Scalars and arrays are both expanded to a set of text
                // values; array fields match when any element matches.
                let clause = format!(
                    "EXISTS (SELECT 1 FROM jsonb_array_elements_text(\
                        CASE WHEN jsonb_typeof(doc -> ${key_idx}) = 'array' \
                             THEN doc -> ${key_idx} \
                             ELSE jsonb_build_array(doc -> ${key_idx}) END\
                     ) AS v(val) WHERE {comparison})"
                );
                conditions.push(clause);
            }
        }
    }

    (format!("WHERE {}", conditions.join(" AND ")), binds, bind_idx)
}

fn order_clause(sort: SortSpec) -> String {
    let column = match sort.key {
        SortKey::CreatedAt => "created_at",
        SortKey::UpdatedAt => "updated_at",
        SortKey::Sequence => "sequence",
    };
    let direction = if sort.descending { "DESC" } else { "ASC" };
    format!("ORDER BY {column} {direction}, id {direction}")
}

// ---------------------------------------------------------------------------
// DocumentStore
// ---------------------------------------------------------------------------

#[async_trait]
impl DocumentStore for PgStore {
    async fn insert(
        &self,
        collection: Collection,
        doc: &StoredDocument,
    ) -> Result<(), StoreError> {
        let query = format!(
            "INSERT INTO {table} \
                (id, slug, sequence, email, owner_id, doc, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            table = collection.table()
        );
        sqlx::query(&query)
            .bind(doc.id.as_str())
            .bind(doc.slug.as_deref())
            .bind(doc.sequence)
            .bind(doc.email.as_deref())
            .bind(doc.owner_id.as_deref())
            .bind(&doc.body)
            .bind(doc.created_at)
            .bind(doc.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| classify_write_error(collection, e))?;
        Ok(())
    }

    async fn find_by_id(
        &self,
        collection: Collection,
        id: &ObjectId,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM {table} WHERE id = $1 AND deleted_at IS NULL",
            table = collection.table()
        );
        sqlx::query_as::<_, DocumentRow>(&query)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(StoredDocument::try_from)
            .transpose()
    }

    async fn find_by_slug(
        &self,
        collection: Collection,
        slug: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM {table} WHERE slug = $1 AND deleted_at IS NULL",
            table = collection.table()
        );
        sqlx::query_as::<_, DocumentRow>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?
            .map(StoredDocument::try_from)
            .transpose()
    }

    async fn find_all(&self, collection: Collection) -> Result<Vec<StoredDocument>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM {table} WHERE deleted_at IS NULL \
             ORDER BY created_at ASC, id ASC",
            table = collection.table()
        );
        let rows = sqlx::query_as::<_, DocumentRow>(&query)
            .fetch_all(&self.pool)
            .await?;
        into_documents(rows)
    }

    async fn find_many(
        &self,
        collection: Collection,
        ids: &[ObjectId],
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let ids: Vec<String> = ids.iter().map(|id| id.as_str().to_string()).collect();
        let query = format!(
            "SELECT {COLUMNS} FROM {table} WHERE id = ANY($1) AND deleted_at IS NULL",
            table = collection.table()
        );
        let rows = sqlx::query_as::<_, DocumentRow>(&query)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;
        into_documents(rows)
    }

    async fn slug_exists(&self, collection: Collection, slug: &str) -> Result<bool, StoreError> {
        let query = format!(
            "SELECT EXISTS(SELECT 1 FROM {table} WHERE slug = $1 AND deleted_at IS NULL)",
            table = collection.table()
        );
        let exists = sqlx::query_scalar::<_, bool>(&query)
            .bind(slug)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn email_taken(
        &self,
        collection: Collection,
        email: &str,
        exclude: Option<&ObjectId>,
    ) -> Result<bool, StoreError> {
        let query = format!(
            "SELECT EXISTS(SELECT 1 FROM {table} \
                WHERE lower(email) = lower($1) AND deleted_at IS NULL \
                  AND ($2::text IS NULL OR id <> $2))",
            table = collection.table()
        );
        let taken = sqlx::query_scalar::<_, bool>(&query)
            .bind(email)
            .bind(exclude.map(ObjectId::as_str))
            .fetch_one(&self.pool)
            .await?;
        Ok(taken)
    }

    async fn max_sequence(&self, collection: Collection) -> Result<Option<i64>, StoreError> {
        let query = format!(
            "SELECT MAX(sequence) FROM {table} WHERE deleted_at IS NULL",
            table = collection.table()
        );
        let max = sqlx::query_scalar::<_, Option<i64>>(&query)
            .fetch_one(&self.pool)
            .await?;
        Ok(max)
    }

    async fn next_counter(&self, name: &str, floor: i64) -> Result<i64, StoreError> {
        let value = sqlx::query_scalar::<_, i64>(
            "INSERT INTO counters (name, value) VALUES ($1, $2 + 1) \
             ON CONFLICT (name) DO UPDATE \
                SET value = GREATEST(counters.value, $2) + 1 \
             RETURNING value",
        )
        .bind(name)
        .bind(floor)
        .fetch_one(&self.pool)
        .await?;
        Ok(value)
    }

    async fn counters(&self) -> Result<Vec<CounterValue>, StoreError> {
        let rows = sqlx::query_as::<_, CounterValue>(
            "SELECT name, value FROM counters ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count(&self, collection: Collection, filter: &FilterSpec) -> Result<i64, StoreError> {
        let (where_clause, binds, _) = build_where(filter, 1);
        let query = format!(
            "SELECT COUNT(*) FROM {table} {where_clause}",
            table = collection.table()
        );

        let mut q = sqlx::query_scalar::<_, i64>(&query);
        for value in binds {
            q = match value {
                BindValue::Text(v) => q.bind(v),
                BindValue::Bool(v) => q.bind(v),
            };
        }
        Ok(q.fetch_one(&self.pool).await?)
    }

    async fn find_page(
        &self,
        collection: Collection,
        filter: &FilterSpec,
        sort: SortSpec,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let (where_clause, binds, bind_idx) = build_where(filter, 1);
        let query = format!(
            "SELECT {COLUMNS} FROM {table} {where_clause} {order} \
             LIMIT ${bind_idx} OFFSET ${next_idx}",
            table = collection.table(),
            order = order_clause(sort),
            next_idx = bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, DocumentRow>(&query);
        // Bind dynamic parameters in order.
        for value in binds {
            q = match value {
                BindValue::Text(v) => q.bind(v),
                BindValue::Bool(v) => q.bind(v),
            };
        }
        let rows = q.bind(limit).bind(skip).fetch_all(&self.pool).await?;
        into_documents(rows)
    }

    async fn replace(
        &self,
        collection: Collection,
        doc: &StoredDocument,
    ) -> Result<bool, StoreError> {
        let query = format!(
            "UPDATE {table} SET doc = $2, email = $3, updated_at = $4 \
             WHERE id = $1 AND deleted_at IS NULL",
            table = collection.table()
        );
        let result = sqlx::query(&query)
            .bind(doc.id.as_str())
            .bind(&doc.body)
            .bind(doc.email.as_deref())
            .bind(doc.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| classify_write_error(collection, e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn assign_sequences(
        &self,
        collection: Collection,
        assignments: &[(ObjectId, i64)],
    ) -> Result<u64, StoreError> {
        let (ids, sequences): (Vec<String>, Vec<i64>) = assignments
            .iter()
            .map(|(id, seq)| (id.as_str().to_string(), *seq))
            .unzip();
        let query = format!(
            "UPDATE {table} AS t SET sequence = u.sequence, updated_at = NOW() \
             FROM UNNEST($1::text[], $2::bigint[]) AS u(id, sequence) \
             WHERE t.id = u.id AND t.deleted_at IS NULL",
            table = collection.table()
        );
        let result = sqlx::query(&query)
            .bind(&ids)
            .bind(&sequences)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn soft_delete(
        &self,
        collection: Collection,
        id: &ObjectId,
    ) -> Result<bool, StoreError> {
        let query = format!(
            "UPDATE {table} SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
            table = collection.table()
        );
        let result = sqlx::query(&query)
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_created_before(
        &self,
        collection: Collection,
        cutoff: Timestamp,
    ) -> Result<u64, StoreError> {
        let query = format!(
            "DELETE FROM {table} WHERE created_at < $1",
            table = collection.table()
        );
        let result = sqlx::query(&query)
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn emails(&self, collection: Collection) -> Result<Vec<String>, StoreError> {
        let query = format!(
            "SELECT email FROM {table} \
             WHERE deleted_at IS NULL AND email IS NOT NULL AND email <> '' \
             ORDER BY created_at ASC, id ASC",
            table = collection.table()
        );
        let emails = sqlx::query_scalar::<_, String>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(emails)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// OutboxStore
// ---------------------------------------------------------------------------

#[async_trait]
impl OutboxStore for PgStore {
    async fn enqueue(&self, message: &NewOutboxMessage) -> Result<OutboxMessage, StoreError> {
        let query = format!(
            "INSERT INTO notification_outbox (kind, payload, max_attempts) \
             VALUES ($1, $2, $3) \
             RETURNING {OUTBOX_COLUMNS}"
        );
        let row = sqlx::query_as::<_, OutboxMessage>(&query)
            .bind(&message.kind)
            .bind(&message.payload)
            .bind(message.max_attempts)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn claim_due(
        &self,
        now: Timestamp,
        limit: i64,
        lease: chrono::Duration,
    ) -> Result<Vec<OutboxMessage>, StoreError> {
        // Expired in-flight leases are reclaimed alongside due pending rows.
        let query = format!(
            "UPDATE notification_outbox SET \
                status = 'in_flight', \
                attempts = attempts + 1, \
                next_attempt_at = $2, \
                updated_at = $1 \
             WHERE id IN ( \
                SELECT id FROM notification_outbox \
                WHERE status IN ('pending', 'in_flight') AND next_attempt_at <= $1 \
                ORDER BY next_attempt_at ASC, id ASC \
                LIMIT $3 \
                FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {OUTBOX_COLUMNS}"
        );
        let mut rows = sqlx::query_as::<_, OutboxMessage>(&query)
            .bind(now)
            .bind(now + lease)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.sort_by_key(|m| m.id);
        Ok(rows)
    }

    async fn mark_sent(&self, id: DbId) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE notification_outbox SET \
                status = 'sent', sent_at = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: DbId,
        error: &str,
        retry_at: Option<Timestamp>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE notification_outbox SET \
                status = CASE WHEN $3::timestamptz IS NULL THEN 'dead' ELSE 'pending' END, \
                last_error = $2, \
                next_attempt_at = COALESCE($3, next_attempt_at), \
                updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .bind(retry_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_message(&self, id: DbId) -> Result<Option<OutboxMessage>, StoreError> {
        let query = format!("SELECT {OUTBOX_COLUMNS} FROM notification_outbox WHERE id = $1");
        let row = sqlx::query_as::<_, OutboxMessage>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_messages(
        &self,
        status: Option<OutboxStatus>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<OutboxMessage>, StoreError> {
        let query = format!(
            "SELECT {OUTBOX_COLUMNS} FROM notification_outbox \
             WHERE ($1::text IS NULL OR status = $1) \
             ORDER BY id DESC \
             LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, OutboxMessage>(&query)
            .bind(status.map(OutboxStatus::as_str))
            .bind(limit)
            .bind(skip)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count_messages(&self, status: Option<OutboxStatus>) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notification_outbox WHERE ($1::text IS NULL OR status = $1)",
        )
        .bind(status.map(OutboxStatus::as_str))
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn requeue(&self, id: DbId) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE notification_outbox SET \
                status = 'pending', attempts = 0, next_attempt_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = 'dead'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_only_excludes_deleted() {
        let (clause, binds, next) = build_where(&FilterSpec::new(), 1);
        assert_eq!(clause, "WHERE deleted_at IS NULL");
        assert!(binds.is_empty());
        assert_eq!(next, 1);
    }

    #[test]
    fn body_conditions_bind_key_and_value() {
        let spec = FilterSpec::new()
            .equals_ignore_case("email", Some("A@X.com"))
            .contains("city", Some("50%_off"));
        let (clause, binds, next) = build_where(&spec, 1);

        assert!(clause.contains("lower(v.val) = lower($2)"));
        assert!(clause.contains("v.val ILIKE $4"));
        assert_eq!(
            binds,
            vec![
                BindValue::Text("email".into()),
                BindValue::Text("A@X.com".into()),
                BindValue::Text("city".into()),
                BindValue::Text("%50\\%\\_off%".into()),
            ]
        );
        assert_eq!(next, 5);
    }

    #[test]
    fn owner_and_flag_conditions() {
        let spec = FilterSpec::new().owned_by("user-1").flag("remote", Some(true));
        let (clause, binds, next) = build_where(&spec, 1);

        assert!(clause.contains("owner_id = $1"));
        assert!(clause.contains("doc -> $2 = to_jsonb($3::boolean)"));
        assert_eq!(binds.len(), 3);
        assert_eq!(next, 4);
    }

    #[test]
    fn order_breaks_ties_on_id() {
        assert_eq!(
            order_clause(SortSpec::NEWEST_FIRST),
            "ORDER BY created_at DESC, id DESC"
        );
        assert_eq!(
            order_clause(SortSpec::BY_SEQUENCE),
            "ORDER BY sequence ASC, id ASC"
        );
    }
}
