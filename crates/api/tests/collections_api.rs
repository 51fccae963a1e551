//! HTTP tests for the generic collection endpoints.
//!
//! Covers create/list/get over the in-memory store, identifier fallback
//! (canonical id, short id, slug), pagination, reorder, private-field
//! redaction and the 401/403 authorization split.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::*;

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_assigns_slug_sequence_and_owner() {
    let app = build_test_app();
    let token = teacher_token("u-1", "asha@example.com");

    let data = create(
        &app,
        "/api/teachers",
        teacher_body("Asha Rao", "asha@example.com"),
        &token,
    )
    .await;

    assert_eq!(data["slug"], "asha-rao");
    assert_eq!(data["sequence"], 1);
    assert_eq!(data["owner_id"], "u-1");
    assert_eq!(data["short_id"].as_str().unwrap().len(), 6);
    assert!(data["id"].as_str().unwrap().ends_with(data["short_id"].as_str().unwrap()));
    // the creator sees their own phone number
    assert_eq!(data["phone"], "9876543210");
}

#[tokio::test]
async fn create_without_token_returns_401() {
    let app = build_test_app();

    let response = post_json(
        app.app(),
        "/api/teachers",
        teacher_body("Asha Rao", "asha@example.com"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn duplicate_email_differing_in_case_returns_409() {
    let app = build_test_app();
    let token = admin_token();
    create(
        &app,
        "/api/teachers",
        teacher_body("Asha Rao", "asha@example.com"),
        &token,
    )
    .await;

    let response = post_json_auth(
        app.app(),
        "/api/teachers",
        teacher_body("Asha R", "ASHA@Example.com"),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "CONFLICT");
}

#[tokio::test]
async fn missing_required_field_returns_400() {
    let app = build_test_app();

    let response = post_json_auth(
        app.app(),
        "/api/teachers",
        json!({ "name": "No Email", "phone": "9876543210" }),
        &admin_token(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn colliding_names_get_numbered_slugs() {
    let app = build_test_app();
    let token = admin_token();

    let first = create(&app, "/api/teachers", teacher_body("Asha Rao", "a1@example.com"), &token).await;
    let second = create(&app, "/api/teachers", teacher_body("Asha Rao", "a2@example.com"), &token).await;

    assert_eq!(first["slug"], "asha-rao");
    assert_eq!(second["slug"], "asha-rao-1");
    assert_eq!(second["sequence"], 2);
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_resolves_canonical_short_id_and_slug() {
    let app = build_test_app();
    let data = create(
        &app,
        "/api/teachers",
        teacher_body("Asha Rao", "asha@example.com"),
        &admin_token(),
    )
    .await;
    let id = data["id"].as_str().unwrap().to_string();
    let short_id = data["short_id"].as_str().unwrap().to_string();

    for key in [id.as_str(), short_id.as_str(), "asha-rao"] {
        let response = get(app.app(), &format!("/api/teachers/{key}")).await;
        assert_eq!(response.status(), StatusCode::OK, "lookup by {key}");
        let json = body_json(response).await;
        assert_eq!(json["data"]["id"], id.as_str());
    }
}

#[tokio::test]
async fn get_unknown_key_returns_404() {
    let app = build_test_app();

    let response = get(app.app(), "/api/teachers/nobody-here").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "Teacher 'nobody-here' not found");
}

#[tokio::test]
async fn public_reads_mask_phone_numbers() {
    let app = build_test_app();
    let owner = teacher_token("u-1", "asha@example.com");
    create(
        &app,
        "/api/teachers",
        teacher_body("Asha Rao", "asha@example.com"),
        &owner,
    )
    .await;

    let public = body_json(get(app.app(), "/api/teachers/asha-rao").await).await;
    assert_eq!(public["data"]["phone"], "********10");

    let own = body_json(get_auth(app.app(), "/api/teachers/asha-rao", &owner).await).await;
    assert_eq!(own["data"]["phone"], "9876543210");

    let admin = body_json(get_auth(app.app(), "/api/teachers/asha-rao", &admin_token()).await).await;
    assert_eq!(admin["data"]["phone"], "9876543210");
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_uses_collection_key_and_pagination() {
    let app = build_test_app();
    let token = admin_token();
    for i in 0..3 {
        create(
            &app,
            "/api/non-teachers",
            json!({
                "name": format!("Staff {i}"),
                "email": format!("staff{i}@example.com"),
                "phone": "9876543210",
                "staff_role": "Librarian"
            }),
            &token,
        )
        .await;
    }

    let response = get(app.app(), "/api/non-teachers?limit=2&page=2").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    assert_eq!(json["non_teachers"].as_array().unwrap().len(), 1);
    assert_eq!(json["non_teachers"][0]["name"], "Staff 2");
    assert_eq!(json["pagination"], json!({ "total": 3, "page": 2, "pages": 2 }));
}

#[tokio::test]
async fn list_filters_by_city() {
    let app = build_test_app();
    let token = admin_token();
    create(&app, "/api/teachers", teacher_body("Asha Rao", "asha@example.com"), &token).await;
    let mut other = teacher_body("Ravi Kumar", "ravi@example.com");
    other["city"] = json!("Nagpur");
    create(&app, "/api/teachers", other, &token).await;

    let json = body_json(get(app.app(), "/api/teachers?city=nagpur").await).await;

    let teachers = json["teachers"].as_array().unwrap();
    assert_eq!(teachers.len(), 1);
    assert_eq!(teachers[0]["name"], "Ravi Kumar");
}

#[tokio::test]
async fn mine_without_token_returns_401() {
    let app = build_test_app();

    let response = get(app.app(), "/api/teachers?mine=true").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn mine_lists_only_the_callers_records() {
    let app = build_test_app();
    let asha = teacher_token("u-1", "asha@example.com");
    let ravi = teacher_token("u-2", "ravi@example.com");
    create(&app, "/api/teachers", teacher_body("Asha Rao", "asha@example.com"), &asha).await;
    create(&app, "/api/teachers", teacher_body("Ravi Kumar", "ravi@example.com"), &ravi).await;

    let json = body_json(get_auth(app.app(), "/api/teachers?mine=true", &ravi).await).await;

    let teachers = json["teachers"].as_array().unwrap();
    assert_eq!(teachers.len(), 1);
    assert_eq!(teachers[0]["name"], "Ravi Kumar");
    assert_eq!(json["pagination"]["total"], 1);
}

// ---------------------------------------------------------------------------
// Reorder
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reorder_changes_listing_order() {
    let app = build_test_app();
    let token = admin_token();
    let mut ids = Vec::new();
    for name in ["One", "Two", "Three"] {
        let data = create(
            &app,
            "/api/teachers",
            teacher_body(name, &format!("{}@example.com", name.to_lowercase())),
            &token,
        )
        .await;
        ids.push(data["id"].as_str().unwrap().to_string());
    }

    let response = put_json_auth(
        app.app(),
        "/api/teachers/reorder",
        json!({ "ordered_ids": [ids[2], ids[0], ids[1]] }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(get(app.app(), "/api/teachers").await).await;
    let names: Vec<&str> = json["teachers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Three", "One", "Two"]);
}

#[tokio::test]
async fn reorder_requires_admin() {
    let app = build_test_app();

    let anonymous = send(
        app.app(),
        axum::http::Method::PUT,
        "/api/teachers/reorder",
        None,
        Some(json!({ "ordered_ids": [] })),
    )
    .await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let teacher = put_json_auth(
        app.app(),
        "/api/teachers/reorder",
        json!({ "ordered_ids": [] }),
        &teacher_token("u-1", "asha@example.com"),
    )
    .await;
    assert_eq!(teacher.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn reorder_with_duplicate_ids_returns_400() {
    let app = build_test_app();
    let token = admin_token();
    let data = create(&app, "/api/teachers", teacher_body("One", "one@example.com"), &token).await;
    let id = data["id"].as_str().unwrap();

    let response = put_json_auth(
        app.app(),
        "/api/teachers/reorder",
        json!({ "ordered_ids": [id, id] }),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Update / delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn patch_by_another_user_returns_403() {
    let app = build_test_app();
    create(
        &app,
        "/api/teachers",
        teacher_body("Asha Rao", "asha@example.com"),
        &teacher_token("u-1", "asha@example.com"),
    )
    .await;

    let response = patch_json_auth(
        app.app(),
        "/api/teachers/asha-rao",
        json!({ "city": "Mumbai" }),
        &teacher_token("u-2", "ravi@example.com"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["code"], "FORBIDDEN");
}

#[tokio::test]
async fn owner_patch_merges_and_keeps_slug() {
    let app = build_test_app();
    let owner = teacher_token("u-1", "asha@example.com");
    create(&app, "/api/teachers", teacher_body("Asha Rao", "asha@example.com"), &owner).await;

    let response = patch_json_auth(
        app.app(),
        "/api/teachers/asha-rao",
        json!({ "name": "Asha R. Rao", "city": null }),
        &owner,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    assert_eq!(json["data"]["name"], "Asha R. Rao");
    assert_eq!(json["data"]["slug"], "asha-rao");
    assert!(json["data"]["city"].is_null());
    assert_eq!(json["data"]["email"], "asha@example.com");
}

#[tokio::test]
async fn delete_requires_admin_and_hides_record() {
    let app = build_test_app();
    let owner = teacher_token("u-1", "asha@example.com");
    create(&app, "/api/teachers", teacher_body("Asha Rao", "asha@example.com"), &owner).await;

    let forbidden = delete_auth(app.app(), "/api/teachers/asha-rao", &owner).await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let deleted = delete_auth(app.app(), "/api/teachers/asha-rao", &admin_token()).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = get(app.app(), "/api/teachers/asha-rao").await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_token_returns_401_even_on_public_reads() {
    let app = build_test_app();

    let response = get_auth(app.app(), "/api/teachers", "not-a-jwt").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_query_returns_400_envelope() {
    let app = build_test_app();

    for uri in [
        "/api/teachers?limit=abc",
        "/api/vacancies?page=x",
        "/api/teachers?mine=maybe",
    ] {
        let response = get(app.app(), uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let json = body_json(response).await;
        assert_eq!(json["code"], "BAD_REQUEST", "{uri}");
        assert!(json["error"].is_string(), "{uri}");
    }
}
