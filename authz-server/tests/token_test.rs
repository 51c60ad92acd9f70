//! Token issuance and verification through the HTTP surface.

mod common;

use axum::http::StatusCode;
use common::*;

#[tokio::test]
async fn test_user_token_scoped_to_group_carries_policy() {
    let app = TestApp::spawn();

    let (status, body) = app
        .send(token_request(
            USER_EMAIL,
            PASSWORD,
            &format!("group_id={}", GROUP_ID),
            Some(SERVICE_API_KEY),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");

    let token = body["token"].as_str().unwrap();
    let claims = app.state.tokens.parse(token).unwrap();
    assert_eq!(claims.user_id, USER_ID.to_string());
    assert_eq!(claims.user_uuid, USER_UUID);
    assert_eq!(claims.service_id, SERVICE_ID.to_string());
    assert_eq!(claims.role_id, GROUP_ROLE_ID.to_string());
    assert_eq!(claims.policy_id, POLICY_ID.to_string());
    assert_eq!(body["expires"], claims.expires);

    let auth_user = app
        .state
        .tokens
        .verify_user(&format!("Bearer {}", token))
        .await
        .unwrap();
    assert_eq!(auth_user.user_id, USER_ID);
    assert_eq!(auth_user.user_uuid.to_string().to_uppercase(), USER_UUID);
    assert_eq!(auth_user.service_id, SERVICE_ID);
    assert_eq!(auth_user.role_id, GROUP_ROLE_ID);
    assert_eq!(auth_user.policy_id, POLICY_ID);
}

#[tokio::test]
async fn test_user_token_without_group_is_unscoped() {
    let app = TestApp::spawn();

    let token = app.user_token().await;

    let claims = app.state.tokens.parse(&token).unwrap();
    assert_eq!(claims.role_id, "0");
    assert_eq!(claims.policy_id, "0");
}

#[tokio::test]
async fn test_group_without_policy_is_rejected() {
    let app = TestApp::spawn();

    let (status, _) = app
        .send(token_request(
            USER_EMAIL,
            PASSWORD,
            "group_id=6",
            Some(SERVICE_API_KEY),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_user_token_requires_api_key() {
    let app = TestApp::spawn();

    let (missing, body) = app
        .send(token_request(USER_EMAIL, PASSWORD, "", None))
        .await;
    assert_eq!(missing, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Not found registered services by Api-Key");

    let (unknown, _) = app
        .send(token_request(USER_EMAIL, PASSWORD, "", Some("nope")))
        .await;
    assert_eq!(unknown, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wrong_password_is_bad_request() {
    let app = TestApp::spawn();

    let (status, body) = app
        .send(token_request(
            USER_EMAIL,
            "wrong-password",
            "",
            Some(SERVICE_API_KEY),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Failed to email or password");
}

#[tokio::test]
async fn test_invalid_query_parameters() {
    let app = TestApp::spawn();

    let (status, body) = app
        .send(token_request(USER_EMAIL, PASSWORD, "type=admin", Some(SERVICE_API_KEY)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Not support type of query parameter");

    let (status, body) = app
        .send(token_request(
            USER_EMAIL,
            PASSWORD,
            "group_id=abc",
            Some(SERVICE_API_KEY),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Group id is only integer of query parameter");
}

#[tokio::test]
async fn test_operator_token_round_trip() {
    let app = TestApp::spawn();

    let token = app.operator_token().await;

    let auth_user = app
        .state
        .tokens
        .verify_operator(&format!("Bearer {}", token))
        .await
        .unwrap();
    assert_eq!(auth_user.user_id, OPERATOR_ID);
    assert_eq!(auth_user.service_id, 0);
    assert_eq!(auth_user.policy_id, 0);
}

#[tokio::test]
async fn test_non_operator_cannot_get_operator_token() {
    let app = TestApp::spawn();

    let (status, body) = app
        .send(token_request(USER_EMAIL, PASSWORD, "type=operator", None))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Can not issue token");
}

#[tokio::test]
async fn test_malformed_credentials_fail_validation() {
    let app = TestApp::spawn();

    let (status, body) = app
        .send(token_request("not-an-email", PASSWORD, "", Some(SERVICE_API_KEY)))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Failed to request validation.");
}
