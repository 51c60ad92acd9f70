pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    security_headers::security_headers_middleware,
    tracing::{request_id_middleware, RequestId},
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::middleware::{intercept_middleware, Interceptor, InterceptorState, RouteAuth};
use crate::models::{Scope, API_KEY_HEADER};
use crate::services::{GroupProvisioner, PolicyResolver, TokenEngine};
use crate::store::{with_timeout, CredentialStore};

#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub store: Arc<dyn CredentialStore>,
    pub tokens: TokenEngine,
    pub groups: GroupProvisioner,
    pub interceptor: Interceptor,
}

impl AppState {
    /// Wire the long-lived services over one shared store.
    pub fn new(config: ServerConfig, store: Arc<dyn CredentialStore>) -> Result<Self, AppError> {
        let timeout = config.store.timeout();

        let resolver = PolicyResolver::new(store.clone(), timeout);
        let tokens = TokenEngine::new(&config.token, store.clone(), resolver, timeout)?;
        let groups = GroupProvisioner::new(store.clone(), timeout);
        let interceptor = Interceptor::new(tokens.clone());

        Ok(Self {
            config,
            store,
            tokens,
            groups,
            interceptor,
        })
    }

    fn route_auth(&self, auth: RouteAuth) -> InterceptorState {
        InterceptorState::new(self.interceptor.clone(), auth)
    }
}

pub fn build_router(state: AppState) -> Router {
    let public = state.route_auth(RouteAuth::Public);
    let user = state.route_auth(RouteAuth::Required(Scope::User));
    let operator = state.route_auth(RouteAuth::Required(Scope::Operator));

    let api = Router::new()
        .route(
            "/api/v1/token",
            post(handlers::issue_token)
                .route_layer(from_fn_with_state(public.clone(), intercept_middleware))
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/v1/users",
            post(handlers::register)
                .route_layer(from_fn_with_state(public, intercept_middleware))
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/v1/users/group",
            post(handlers::create_group)
                .route_layer(from_fn_with_state(user, intercept_middleware))
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/operators/service",
            post(handlers::create_service)
                .route_layer(from_fn_with_state(operator, intercept_middleware))
                .fallback(handlers::method_not_allowed),
        );

    Router::new()
        .route(
            "/health",
            get(health_check).fallback(handlers::method_not_allowed),
        )
        .merge(api)
        .fallback(handlers::not_found)
        .with_state(state.clone())
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                // Set by `request_id_middleware`, which wraps this layer.
                let request_id = request
                    .extensions()
                    .get::<RequestId>()
                    .map(|id| id.0.as_str())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.security.allowed_origins))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(API_KEY_HEADER),
        ]);

    // Wildcards are rejected in production by config validation.
    if allowed_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(AllowOrigin::any());
    }

    let origins = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect::<Vec<HeaderValue>>();

    layer.allow_origin(origins)
}

/// Service health check
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    with_timeout(state.config.store.timeout(), state.store.health_check())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Credential store health check failed");
            AppError::from(e)
        })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
    })))
}
