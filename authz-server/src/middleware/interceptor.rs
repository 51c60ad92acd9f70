//! Request interceptor run in front of every API endpoint.
//!
//! Each request moves through
//! `Start -> HeaderValidated -> (TokenVerified | Unauthenticated) -> BodyBound -> Dispatched`
//! and stops at the first rejection. Nothing is kept between requests: the
//! [`RequestContext`] and optional [`AuthUser`] travel in the request's own
//! extensions.

use axum::{
    async_trait,
    body::{Body, Bytes},
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;
use std::fmt;

use crate::models::{AuthUser, RequestContext, Scope};
use crate::services::TokenEngine;

/// Largest request body the interceptor buffers.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Authentication a route declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAuth {
    /// Login, registration and bootstrap endpoints.
    Public,
    Required(Scope),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    HeaderValidated,
    TokenVerified,
    Unauthenticated,
    BodyBound,
    Dispatched,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::HeaderValidated => "header_validated",
            Stage::TokenVerified => "token_verified",
            Stage::Unauthenticated => "unauthenticated",
            Stage::BodyBound => "body_bound",
            Stage::Dispatched => "dispatched",
        };
        f.write_str(name)
    }
}

/// Outcome of a request that made it through the pipeline.
#[derive(Debug)]
pub struct Intercepted {
    pub context: RequestContext,
    pub auth_user: Option<AuthUser>,
    pub body: Bytes,
}

#[derive(Clone)]
pub struct Interceptor {
    tokens: TokenEngine,
}

fn rejected(stage: Stage, err: AppError) -> AppError {
    tracing::info!(stage = %stage, error = %err, "Request rejected");
    err
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case(JSON_CONTENT_TYPE))
        .unwrap_or(false)
}

impl Interceptor {
    pub fn new(tokens: TokenEngine) -> Self {
        Self { tokens }
    }

    pub async fn intercept(
        &self,
        headers: &HeaderMap,
        body: Body,
        auth: RouteAuth,
    ) -> Result<Intercepted, AppError> {
        if !is_json_content_type(headers) {
            return Err(rejected(
                Stage::Start,
                AppError::bad_request("Not allowed content-type"),
            ));
        }
        let context = RequestContext::from_headers(headers);

        let auth_user = match auth {
            RouteAuth::Public => None,
            RouteAuth::Required(scope) => {
                let authorization = context.authorization.as_deref().ok_or_else(|| {
                    rejected(Stage::HeaderValidated, AppError::unauthorized("Unauthorized."))
                })?;

                let user = self
                    .tokens
                    .verify(scope, authorization)
                    .await
                    .map_err(|e| rejected(Stage::HeaderValidated, e))?;
                Some(user)
            }
        };
        let stage = if auth_user.is_some() {
            Stage::TokenVerified
        } else {
            Stage::Unauthenticated
        };

        let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|e| {
                rejected(
                    stage,
                    AppError::InternalError(anyhow::anyhow!("Failed to read request body: {}", e)),
                )
            })?;

        tracing::debug!(stage = %Stage::BodyBound, bytes = body.len(), "Request body buffered");

        Ok(Intercepted {
            context,
            auth_user,
            body,
        })
    }
}

/// Route-level state: the shared interceptor plus what the route requires.
#[derive(Clone)]
pub struct InterceptorState {
    pub interceptor: Interceptor,
    pub auth: RouteAuth,
}

impl InterceptorState {
    pub fn new(interceptor: Interceptor, auth: RouteAuth) -> Self {
        Self { interceptor, auth }
    }
}

/// Run the interceptor and hand the rebuilt request to the endpoint.
pub async fn intercept_middleware(
    State(state): State<InterceptorState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let intercepted = state
        .interceptor
        .intercept(&parts.headers, body, state.auth)
        .await?;

    parts.extensions.insert(intercepted.context);
    if let Some(user) = intercepted.auth_user {
        parts.extensions.insert(user);
    }

    tracing::debug!(stage = %Stage::Dispatched, path = %parts.uri.path(), "Dispatching request");
    Ok(next.run(Request::from_parts(parts, Body::from(intercepted.body))).await)
}

/// The verified caller of an authenticated route.
pub struct CurrentUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts.extensions.get::<AuthUser>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Auth user missing from request extensions"
            ))
        })?;

        Ok(CurrentUser(user.clone()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_else(|| RequestContext::from_headers(&parts.headers)))
    }
}
