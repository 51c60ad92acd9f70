//! Service model - tenant applications identified by an API key.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Service entity.
#[derive(Debug, Clone, FromRow)]
pub struct Service {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub api_key: String,
    pub created_at: DateTime<Utc>,
}

/// Row to insert when an operator registers a service.
#[derive(Debug, Clone)]
pub struct NewService {
    pub uuid: Uuid,
    pub name: String,
    pub api_key: String,
}

impl NewService {
    /// New service with a generated UUID and a dash-free UUID API key.
    pub fn new(name: String) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name,
            api_key: Uuid::new_v4().simple().to_string(),
        }
    }
}

/// Service response for API. The API key is only returned to operators.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceResponse {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub api_key: String,
    pub created_at: DateTime<Utc>,
}

impl From<Service> for ServiceResponse {
    fn from(s: Service) -> Self {
        Self {
            id: s.id,
            uuid: s.uuid,
            name: s.name,
            api_key: s.api_key,
            created_at: s.created_at,
        }
    }
}

/// Membership of a user in a service.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct UserService {
    pub id: i64,
    pub user_id: i64,
    pub service_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_api_key_has_no_dashes() {
        let service = NewService::new("billing".to_string());
        assert_eq!(service.api_key.len(), 32);
        assert!(!service.api_key.contains('-'));
        assert_ne!(service.api_key, NewService::new("billing".to_string()).api_key);
    }
}
