//! Postgres store tests.
//!
//! These need a live database (`DATABASE_URL`) and are ignored by default:
//! `cargo test -p eduboard-db -- --ignored`.

use assert_matches::assert_matches;
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use eduboard_core::filter::{FilterSpec, SortSpec};
use eduboard_core::types::ObjectId;
use eduboard_db::models::outbox::{NewOutboxMessage, OutboxStatus};
use eduboard_db::{Collection, DocumentStore, OutboxStore, PgStore, StoreError, StoredDocument};

fn doc(slug: &str, email: &str, body: serde_json::Value) -> StoredDocument {
    let now = Utc::now();
    StoredDocument {
        id: ObjectId::generate_at(now),
        slug: Some(slug.to_string()),
        sequence: None,
        email: Some(email.to_string()),
        owner_id: Some("owner-1".to_string()),
        body,
        created_at: now,
        updated_at: now,
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_health_check(pool: PgPool) {
    eduboard_db::health_check(&pool).await.unwrap();
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_unique_email_index_is_case_insensitive(pool: PgPool) {
    let store = PgStore::new(pool);
    store
        .insert(Collection::Teachers, &doc("a", "a@x.com", json!({})))
        .await
        .unwrap();

    let err = store
        .insert(Collection::Teachers, &doc("b", "A@X.com", json!({})))
        .await
        .unwrap_err();
    assert_matches!(err, StoreError::Duplicate { ref field, .. } if field == "email");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_slug_index_ignores_soft_deleted_rows(pool: PgPool) {
    let store = PgStore::new(pool);
    let first = doc("dup", "a@x.com", json!({}));
    store.insert(Collection::Schools, &first).await.unwrap();

    let err = store
        .insert(Collection::Schools, &doc("dup", "b@x.com", json!({})))
        .await
        .unwrap_err();
    assert_matches!(err, StoreError::Duplicate { ref field, .. } if field == "slug");

    assert!(store.soft_delete(Collection::Schools, &first.id).await.unwrap());
    store
        .insert(Collection::Schools, &doc("dup", "c@x.com", json!({})))
        .await
        .unwrap();
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_filters_match_array_elements_and_substrings(pool: PgPool) {
    let store = PgStore::new(pool);
    store
        .insert(
            Collection::Teachers,
            &doc("a", "a@x.com", json!({ "city": "Pune", "subjects": ["Maths", "Physics"] })),
        )
        .await
        .unwrap();
    store
        .insert(
            Collection::Teachers,
            &doc("b", "b@x.com", json!({ "city": "Mumbai", "subjects": ["History"] })),
        )
        .await
        .unwrap();

    let spec = FilterSpec::new().contains("subjects", Some("phys"));
    assert_eq!(store.count(Collection::Teachers, &spec).await.unwrap(), 1);

    let spec = FilterSpec::new().equals("city", Some("Mumbai")).owned_by("owner-1");
    let page = store
        .find_page(Collection::Teachers, &spec, SortSpec::NEWEST_FIRST, 0, 10)
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].slug.as_deref(), Some("b"));

    let spec = FilterSpec::new().contains("city", Some("%"));
    assert_eq!(store.count(Collection::Teachers, &spec).await.unwrap(), 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_counter_never_falls_below_floor(pool: PgPool) {
    let store = PgStore::new(pool);
    assert_eq!(store.next_counter("teachers", 0).await.unwrap(), 1);
    assert_eq!(store.next_counter("teachers", 0).await.unwrap(), 2);
    assert_eq!(store.next_counter("teachers", 40).await.unwrap(), 41);

    let counters = store.counters().await.unwrap();
    assert_eq!(counters.len(), 1);
    assert_eq!(counters[0].value, 41);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_outbox_claim_retry_and_dead(pool: PgPool) {
    let store = PgStore::new(pool);
    let message = store
        .enqueue(&NewOutboxMessage {
            kind: "email_batch".into(),
            payload: json!({ "recipients": ["a@x.com"] }),
            max_attempts: 2,
        })
        .await
        .unwrap();

    let lease = chrono::Duration::seconds(60);
    let claimed = store.claim_due(Utc::now(), 10, lease).await.unwrap();
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].attempts, 1);
    assert!(store.claim_due(Utc::now(), 10, lease).await.unwrap().is_empty());

    store
        .mark_failed(message.id, "smtp timeout", Some(Utc::now()))
        .await
        .unwrap();
    let claimed = store.claim_due(Utc::now(), 10, lease).await.unwrap();
    assert_eq!(claimed[0].attempts, 2);

    store.mark_failed(message.id, "smtp timeout", None).await.unwrap();
    let dead = store.find_message(message.id).await.unwrap().unwrap();
    assert_eq!(dead.status(), Some(OutboxStatus::Dead));
    assert_eq!(dead.last_error.as_deref(), Some("smtp timeout"));

    assert!(store.requeue(message.id).await.unwrap());
    assert_eq!(store.count_messages(Some(OutboxStatus::Pending)).await.unwrap(), 1);
}
