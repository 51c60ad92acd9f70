//! Group model - scoping boundaries inside a service.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Group {
    pub id: i64,
    /// Owning service; names are unique within it.
    pub service_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub name: String,
}

/// Service that originated (or belongs to) a group.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ServiceGroup {
    pub id: i64,
    pub service_id: i64,
    pub group_id: i64,
}

/// User that originated (or belongs to) a group.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct UserGroup {
    pub id: i64,
    pub user_id: i64,
    pub group_id: i64,
}
