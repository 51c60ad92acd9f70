//! Test helpers for authz-server integration tests.
//!
//! Builds the full router over an in-memory credential store seeded with one
//! operator, one user who is a member of two services, and a group policy.

#![allow(dead_code)]

use authz_server::{
    build_router,
    config::{
        CacheConfig, DatabaseConfig, Environment, SecurityConfig, ServerConfig, StoreConfig,
        TokenConfig,
    },
    models::{NewService, NewUser, OPERATOR_ROLE_ID},
    store::InMemoryCredentialStore,
    utils::hash_password,
    AppState,
};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "password123";

pub const OPERATOR_ID: i64 = 1;
pub const OPERATOR_EMAIL: &str = "operator@example.com";

pub const USER_ID: i64 = 7;
pub const USER_UUID: &str = "52F6228E-9169-4563-ADE2-07ED697B67BA";
pub const USER_EMAIL: &str = "u1@example.com";

pub const SERVICE_ID: i64 = 3;
pub const SERVICE_API_KEY: &str = "0f5c6f6f1a3b4c7d8e9f00112233aabb";

/// Second tenant the seeded user also belongs to.
pub const OTHER_SERVICE_ID: i64 = 40;
pub const OTHER_SERVICE_API_KEY: &str = "9a8b7c6d5e4f30211203f4e5d6c7b8a9";

pub const GROUP_ID: i64 = 5;
pub const POLICY_ID: i64 = 9;
pub const GROUP_ROLE_ID: i64 = 2;

pub fn test_config() -> ServerConfig {
    ServerConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "authz-server-test".to_string(),
        service_version: "0.1.0".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: "postgres://localhost/authz_test".to_string(),
            max_connections: 5,
            min_connections: 1,
        },
        token: TokenConfig {
            private_key_base64: "dGVzdC1zaWduaW5nLXNlY3JldA==".to_string(),
            validity_minutes: 60,
            enforce_expiry: false,
        },
        store: StoreConfig { timeout_seconds: 2 },
        cache: CacheConfig {
            refresh_interval_seconds: 300,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryCredentialStore>,
}

impl TestApp {
    pub fn spawn() -> Self {
        let store = Arc::new(InMemoryCredentialStore::new());
        seed(&store);

        let state = AppState::new(test_config(), store.clone()).expect("Failed to build state");
        let router = build_router(state.clone());

        Self {
            router,
            state,
            store,
        }
    }

    /// Send a request through a fresh clone of the router and decode the JSON
    /// body (`Null` when the body is empty).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Response body is not JSON")
        };

        (status, body)
    }

    /// Issue a token through the HTTP endpoint.
    pub async fn token(&self, email: &str, query: &str, api_key: Option<&str>) -> String {
        let request = token_request(email, PASSWORD, query, api_key);
        let (status, body) = self.send(request).await;
        assert_eq!(status, StatusCode::OK, "token request failed: {}", body);
        body["token"].as_str().expect("token missing").to_string()
    }

    pub async fn user_token(&self) -> String {
        self.token(USER_EMAIL, "", Some(SERVICE_API_KEY)).await
    }

    pub async fn other_service_token(&self) -> String {
        self.token(USER_EMAIL, "", Some(OTHER_SERVICE_API_KEY)).await
    }

    pub async fn operator_token(&self) -> String {
        self.token(OPERATOR_EMAIL, "type=operator", None).await
    }
}

fn seed(store: &InMemoryCredentialStore) {
    let hash = hash_password(PASSWORD).expect("Failed to hash password");

    let operator = NewUser::new(
        "operator".to_string(),
        OPERATOR_EMAIL.to_string(),
        hash.clone(),
    );
    store
        .add_user_with_id(OPERATOR_ID, &operator)
        .expect("seed operator");
    store
        .add_operator_policy(OPERATOR_ID, OPERATOR_ROLE_ID)
        .expect("seed operator policy");

    let mut user = NewUser::new("u1".to_string(), USER_EMAIL.to_string(), hash);
    user.uuid = Uuid::parse_str(USER_UUID).expect("uuid");
    store.add_user_with_id(USER_ID, &user).expect("seed user");

    let mut service = NewService::new("svc".to_string());
    service.api_key = SERVICE_API_KEY.to_string();
    store
        .add_service_with_id(SERVICE_ID, &service)
        .expect("seed service");
    store
        .add_user_service(USER_ID, SERVICE_ID)
        .expect("seed membership");

    let mut other = NewService::new("other-svc".to_string());
    other.api_key = OTHER_SERVICE_API_KEY.to_string();
    store
        .add_service_with_id(OTHER_SERVICE_ID, &other)
        .expect("seed service");
    store
        .add_user_service(USER_ID, OTHER_SERVICE_ID)
        .expect("seed membership");

    store
        .add_policy(POLICY_ID, USER_ID, GROUP_ID, GROUP_ROLE_ID)
        .expect("seed policy");
}

pub fn token_request(
    email: &str,
    password: &str,
    query: &str,
    api_key: Option<&str>,
) -> Request<Body> {
    let uri = if query.is_empty() {
        "/api/v1/token".to_string()
    } else {
        format!("/api/v1/token?{}", query)
    };

    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(api_key) = api_key {
        builder = builder.header("Api-Key", api_key);
    }

    builder
        .body(Body::from(
            serde_json::json!({ "email": email, "password": password }).to_string(),
        ))
        .unwrap()
}

pub fn json_post(uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    builder.body(Body::from(body.to_string())).unwrap()
}
