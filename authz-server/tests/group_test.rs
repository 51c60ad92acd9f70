//! Transactional group provisioning.

mod common;

use authz_server::store::GroupWriteStep;
use axum::http::StatusCode;
use common::*;

#[tokio::test]
async fn test_create_group_links_caller_service_and_user() {
    let app = TestApp::spawn();
    let token = app.user_token().await;

    let (status, body) = app
        .send(json_post(
            "/api/v1/users/group",
            Some(&token),
            serde_json::json!({ "name": "eng" }),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "eng");
    assert_eq!(body["service_id"], SERVICE_ID);

    let group_id = body["id"].as_i64().unwrap();
    let service_links = app.store.service_group_links(group_id).unwrap();
    let user_links = app.store.user_group_links(group_id).unwrap();
    assert_eq!(service_links.len(), 1);
    assert_eq!(service_links[0].service_id, SERVICE_ID);
    assert_eq!(user_links.len(), 1);
    assert_eq!(user_links[0].user_id, USER_ID);
}

#[tokio::test]
async fn test_concurrent_duplicate_group_yields_one_conflict() {
    let app = TestApp::spawn();
    let token = app.user_token().await;
    let body = serde_json::json!({ "name": "eng" });

    let (first, second) = tokio::join!(
        app.send(json_post("/api/v1/users/group", Some(&token), body.clone())),
        app.send(json_post("/api/v1/users/group", Some(&token), body.clone())),
    );

    let mut statuses = vec![first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::CONFLICT]);

    let groups = app.store.groups_named("eng").unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(app.store.service_group_links(groups[0].id).unwrap().len(), 1);
    assert_eq!(app.store.user_group_links(groups[0].id).unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_third_insert_leaves_no_rows() {
    let app = TestApp::spawn();
    let token = app.user_token().await;
    app.store.fail_group_write_at(Some(GroupWriteStep::UserGroup));

    let (status, body) = app
        .send(json_post(
            "/api/v1/users/group",
            Some(&token),
            serde_json::json!({ "name": "eng" }),
        ))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
    assert_eq!(app.store.group_count().unwrap(), 0);
    assert_eq!(app.store.service_group_count().unwrap(), 0);
    assert_eq!(app.store.user_group_count().unwrap(), 0);
}

#[tokio::test]
async fn test_empty_group_name_fails_validation() {
    let app = TestApp::spawn();
    let token = app.user_token().await;

    let (status, _) = app
        .send(json_post(
            "/api/v1/users/group",
            Some(&token),
            serde_json::json!({ "name": "" }),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.store.group_count().unwrap(), 0);
}

#[tokio::test]
async fn test_whitespace_group_name_fails_validation() {
    let app = TestApp::spawn();
    let token = app.user_token().await;

    let (status, body) = app
        .send(json_post(
            "/api/v1/users/group",
            Some(&token),
            serde_json::json!({ "name": "   " }),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Failed to request validation.");
    assert_eq!(app.store.group_count().unwrap(), 0);
    assert_eq!(app.store.service_group_count().unwrap(), 0);
    assert_eq!(app.store.user_group_count().unwrap(), 0);
}

#[tokio::test]
async fn test_group_names_are_unique_per_service() {
    let app = TestApp::spawn();
    let first_token = app.user_token().await;
    let other_token = app.other_service_token().await;
    let body = serde_json::json!({ "name": "eng" });

    let (status, first) = app
        .send(json_post("/api/v1/users/group", Some(&first_token), body.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["service_id"], SERVICE_ID);

    let (status, other) = app
        .send(json_post("/api/v1/users/group", Some(&other_token), body.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(other["service_id"], OTHER_SERVICE_ID);
    assert_ne!(first["id"], other["id"]);

    let (status, conflict) = app
        .send(json_post("/api/v1/users/group", Some(&first_token), body))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(conflict["error"], "Already exists");

    assert_eq!(app.store.groups_named("eng").unwrap().len(), 2);
    assert_eq!(app.store.service_group_count().unwrap(), 2);
    assert_eq!(app.store.user_group_count().unwrap(), 2);
}
