//! PostgreSQL credential store.

use async_trait::async_trait;
use sqlx::postgres::PgPool;

use super::{CredentialStore, StoreError};
use crate::models::{
    Group, NewGroup, NewService, NewUser, OperatorPolicy, Policy, Service, User, UserService,
};

#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_operator_policy(
        &self,
        user_id: i64,
        role_id: i64,
    ) -> Result<Option<OperatorPolicy>, StoreError> {
        let policy = sqlx::query_as::<_, OperatorPolicy>(
            "SELECT id, user_id, role_id FROM operator_policies WHERE user_id = $1 AND role_id = $2",
        )
        .bind(user_id)
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(policy)
    }

    async fn find_user_service(
        &self,
        user_id: i64,
        service_id: i64,
    ) -> Result<Option<UserService>, StoreError> {
        let membership = sqlx::query_as::<_, UserService>(
            "SELECT id, user_id, service_id FROM user_services WHERE user_id = $1 AND service_id = $2",
        )
        .bind(user_id)
        .bind(service_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(membership)
    }

    async fn find_policy(
        &self,
        user_id: i64,
        group_id: i64,
    ) -> Result<Option<Policy>, StoreError> {
        let policy = sqlx::query_as::<_, Policy>(
            "SELECT id, name, role_id, user_id, group_id FROM policies WHERE user_id = $1 AND group_id = $2",
        )
        .bind(user_id)
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(policy)
    }

    async fn find_service_by_api_key(
        &self,
        api_key: &str,
    ) -> Result<Option<Service>, StoreError> {
        let service = sqlx::query_as::<_, Service>("SELECT * FROM services WHERE api_key = $1")
            .bind(api_key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(service)
    }

    async fn insert_user(&self, user: &NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (uuid, username, email, password)
            VALUES ($1, $2, $3, $4)
            RETURNING id, uuid, username, email, password, created_at, updated_at
            "#,
        )
        .bind(user.uuid)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert_service(&self, service: &NewService) -> Result<Service, StoreError> {
        let service = sqlx::query_as::<_, Service>(
            r#"
            INSERT INTO services (uuid, name, api_key)
            VALUES ($1, $2, $3)
            RETURNING id, uuid, name, api_key, created_at
            "#,
        )
        .bind(service.uuid)
        .bind(&service.name)
        .bind(&service.api_key)
        .fetch_one(&self.pool)
        .await?;
        Ok(service)
    }

    async fn insert_group_with_links(
        &self,
        group: &NewGroup,
        service_id: i64,
        user_id: i64,
    ) -> Result<Group, StoreError> {
        // Dropping `tx` on any early return rolls the transaction back.
        let mut tx = self.pool.begin().await?;

        let group = sqlx::query_as::<_, Group>(
            "INSERT INTO groups (service_id, name) VALUES ($1, $2) \
             RETURNING id, service_id, name, created_at",
        )
        .bind(service_id)
        .bind(&group.name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Failed to save groups in transaction");
            StoreError::from(e)
        })?;

        sqlx::query("INSERT INTO service_groups (service_id, group_id) VALUES ($1, $2)")
            .bind(service_id)
            .bind(group.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Failed to save service_groups in transaction");
                StoreError::from(e)
            })?;

        sqlx::query("INSERT INTO user_groups (user_id, group_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(group.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Failed to save user_groups in transaction");
                StoreError::from(e)
            })?;

        tx.commit().await?;
        Ok(group)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
