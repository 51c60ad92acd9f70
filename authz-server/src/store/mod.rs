//! Credential store: persistence boundary of the authorization engine.
//!
//! The core only depends on [`CredentialStore`]. [`PgCredentialStore`] backs
//! production, [`InMemoryCredentialStore`] backs tests and local runs.

mod memory;
mod postgres;

pub use memory::{GroupWriteStep, InMemoryCredentialStore};
pub use postgres::PgCredentialStore;

use async_trait::async_trait;
use service_core::error::AppError;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::models::{
    Group, NewGroup, NewService, NewUser, OperatorPolicy, Policy, Service, User, UserService,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Store call exceeded {0:?}")]
    Timeout(Duration),

    #[error("Store backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::UniqueViolation(
                    db_err.constraint().unwrap_or("unknown").to_string(),
                )
            }
            other => StoreError::Backend(anyhow::Error::new(other)),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(_) => AppError::conflict("Already exists"),
            other => AppError::DatabaseError(anyhow::anyhow!(other)),
        }
    }
}

/// Lookups and writes the authorization engine needs.
///
/// Implementations must be safe to share between concurrent requests; each
/// call acquires its own connection or transaction.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>, StoreError>;

    async fn find_operator_policy(
        &self,
        user_id: i64,
        role_id: i64,
    ) -> Result<Option<OperatorPolicy>, StoreError>;

    async fn find_user_service(
        &self,
        user_id: i64,
        service_id: i64,
    ) -> Result<Option<UserService>, StoreError>;

    async fn find_policy(&self, user_id: i64, group_id: i64)
        -> Result<Option<Policy>, StoreError>;

    async fn find_service_by_api_key(&self, api_key: &str)
        -> Result<Option<Service>, StoreError>;

    async fn insert_user(&self, user: &NewUser) -> Result<User, StoreError>;

    async fn insert_service(&self, service: &NewService) -> Result<Service, StoreError>;

    /// Insert a group, its service link and its user link in one transaction,
    /// in that order. Either all three rows become visible or none do.
    async fn insert_group_with_links(
        &self,
        group: &NewGroup,
        service_id: i64,
        user_id: i64,
    ) -> Result<Group, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Bound a store call by `limit`. A call that runs out of time is dropped,
/// which rolls back any transaction it had open.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| StoreError::Timeout(limit))?
}
