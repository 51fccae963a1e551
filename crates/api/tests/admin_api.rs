//! HTTP tests for the admin endpoints and the health check.
//!
//! Verifies outbox listing and the dead-message retry rules, the sequence
//! counter dump, and that all of them are closed to non-admins.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::*;
use eduboard_db::models::outbox::{NewOutboxMessage, OutboxStatus};
use eduboard_db::OutboxStore;

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_store_status() {
    let app = build_test_app();

    let response = get(app.app(), "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["store"], "memory");
    assert_eq!(json["store_healthy"], true);
    assert!(json["version"].is_string());
    assert_eq!(json["outbox"], json!({ "pending": 0, "dead": 0 }));
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = build_test_app();

    let response = get(app.app(), "/api/nothing-here").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "No route for /api/nothing-here");
}

// ---------------------------------------------------------------------------
// Outbox
// ---------------------------------------------------------------------------

#[tokio::test]
async fn outbox_endpoints_require_admin() {
    let app = build_test_app();

    let anonymous = get(app.app(), "/api/admin/outbox").await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let hr = get_auth(app.app(), "/api/admin/outbox", &hr_token()).await;
    assert_eq!(hr.status(), StatusCode::FORBIDDEN);

    let counters = get_auth(app.app(), "/api/admin/counters", &hr_token()).await;
    assert_eq!(counters.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn outbox_list_filters_by_status() {
    let app = build_test_app();
    create(&app, "/api/vacancies", vacancy_body("Maths Teacher"), &admin_token()).await;
    let dead = app
        .store
        .enqueue(&NewOutboxMessage::new("email_batch", json!({ "recipients": [] })))
        .await
        .unwrap();
    app.store.mark_failed(dead.id, "smtp down", None).await.unwrap();

    let all = body_json(get_auth(app.app(), "/api/admin/outbox", &admin_token()).await).await;
    assert_eq!(all["messages"].as_array().unwrap().len(), 2);
    assert_eq!(all["pagination"]["total"], 2);

    let only_dead = body_json(
        get_auth(app.app(), "/api/admin/outbox?status=dead", &admin_token()).await,
    )
    .await;
    let messages = only_dead["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["id"], dead.id);
    assert_eq!(messages[0]["last_error"], "smtp down");
}

#[tokio::test]
async fn outbox_list_rejects_unknown_status() {
    let app = build_test_app();

    let response = get_auth(app.app(), "/api/admin/outbox?status=lost", &admin_token()).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn retry_requeues_dead_message() {
    let app = build_test_app();
    let message = app
        .store
        .enqueue(&NewOutboxMessage::new("email_batch", json!({ "recipients": [] })))
        .await
        .unwrap();
    app.store.mark_failed(message.id, "smtp down", None).await.unwrap();

    let response = post_auth(
        app.app(),
        &format!("/api/admin/outbox/{}/retry", message.id),
        &admin_token(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "pending");
    assert_eq!(json["data"]["attempts"], 0);
    assert_eq!(
        app.store.count_messages(Some(OutboxStatus::Dead)).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn retry_of_live_message_returns_409() {
    let app = build_test_app();
    let message = app
        .store
        .enqueue(&NewOutboxMessage::new("email_batch", json!({ "recipients": [] })))
        .await
        .unwrap();

    let response = post_auth(
        app.app(),
        &format!("/api/admin/outbox/{}/retry", message.id),
        &admin_token(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(
        json["error"],
        format!(
            "Only dead messages can be retried; message {} is pending",
            message.id
        )
    );
}

#[tokio::test]
async fn retry_with_non_numeric_id_returns_400_envelope() {
    let app = build_test_app();

    let response = post_auth(app.app(), "/api/admin/outbox/abc/retry", &admin_token()).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn outbox_list_with_bad_limit_returns_400_envelope() {
    let app = build_test_app();

    let response = get_auth(app.app(), "/api/admin/outbox?limit=ten", &admin_token()).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn retry_of_unknown_message_returns_404() {
    let app = build_test_app();

    let response = post_auth(app.app(), "/api/admin/outbox/999/retry", &admin_token()).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

#[tokio::test]
async fn counters_track_sequenced_inserts() {
    let app = build_test_app();
    let token = admin_token();
    for i in 0..3 {
        create(
            &app,
            "/api/teachers",
            teacher_body(&format!("Teacher {i}"), &format!("t{i}@example.com")),
            &token,
        )
        .await;
    }

    let json = body_json(get_auth(app.app(), "/api/admin/counters", &token).await).await;

    let counters = json["data"].as_array().unwrap();
    let teachers = counters
        .iter()
        .find(|c| c["name"] == "teachers")
        .expect("teachers counter");
    assert_eq!(teachers["value"], 3);
}
