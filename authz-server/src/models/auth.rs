//! Request-scoped authorization values. None of these are persisted.

use axum::http::{header, HeaderMap};
use serde::Serialize;
use service_core::error::AppError;
use uuid::Uuid;

/// Header carrying the calling service's API key.
pub const API_KEY_HEADER: &str = "api-key";

/// Which authorization facts a token encodes and how it is verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Operator,
    User,
}

impl Scope {
    /// Scope from the `type` query parameter of the token endpoint. An empty
    /// value selects the user scope.
    pub fn from_query(value: Option<&str>) -> Result<Self, AppError> {
        match value.map(str::trim).unwrap_or("") {
            "" | "user" => Ok(Scope::User),
            "operator" => Ok(Scope::Operator),
            _ => Err(AppError::bad_request("Not support type of query parameter")),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Operator => "operator",
            Scope::User => "user",
        }
    }
}

/// Identifying values of one inbound request, read once from its headers and
/// passed explicitly to whatever needs them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub api_key: Option<String>,
    pub authorization: Option<String>,
}

impl RequestContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        Self {
            api_key: read(API_KEY_HEADER),
            authorization: read(header::AUTHORIZATION.as_str()),
        }
    }
}

/// Authorization record rebuilt from a verified token on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub username: String,
    pub user_id: i64,
    pub user_uuid: Uuid,
    pub email: String,
    pub service_id: i64,
    pub role_id: i64,
    pub policy_id: i64,
    pub expires: String,
}
