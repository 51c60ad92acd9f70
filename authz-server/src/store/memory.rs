//! In-memory credential store with the same uniqueness rules as the schema.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Mutex, MutexGuard};

use super::{CredentialStore, StoreError};
use crate::models::{
    Group, NewGroup, NewService, NewUser, OperatorPolicy, Policy, Service, ServiceGroup, User,
    UserGroup, UserService,
};

/// Write of the group transaction that a test can force to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupWriteStep {
    Group,
    ServiceGroup,
    UserGroup,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    next_id: i64,
    users: Vec<User>,
    services: Vec<Service>,
    groups: Vec<Group>,
    policies: Vec<Policy>,
    operator_policies: Vec<OperatorPolicy>,
    user_services: Vec<UserService>,
    user_groups: Vec<UserGroup>,
    service_groups: Vec<ServiceGroup>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn insert_group(&mut self, service_id: i64, name: &str) -> Result<Group, StoreError> {
        if self
            .groups
            .iter()
            .any(|g| g.service_id == service_id && g.name == name)
        {
            return Err(StoreError::UniqueViolation(
                "groups_service_id_name_key".to_string(),
            ));
        }
        let group = Group {
            id: self.next_id(),
            service_id,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.groups.push(group.clone());
        Ok(group)
    }

    fn insert_service_group(&mut self, service_id: i64, group_id: i64) -> Result<(), StoreError> {
        if self
            .service_groups
            .iter()
            .any(|sg| sg.service_id == service_id && sg.group_id == group_id)
        {
            return Err(StoreError::UniqueViolation(
                "service_groups_service_id_group_id_key".to_string(),
            ));
        }
        let id = self.next_id();
        self.service_groups.push(ServiceGroup {
            id,
            service_id,
            group_id,
        });
        Ok(())
    }

    fn insert_user_group(&mut self, user_id: i64, group_id: i64) -> Result<(), StoreError> {
        if self
            .user_groups
            .iter()
            .any(|ug| ug.user_id == user_id && ug.group_id == group_id)
        {
            return Err(StoreError::UniqueViolation(
                "user_groups_user_id_group_id_key".to_string(),
            ));
        }
        let id = self.next_id();
        self.user_groups.push(UserGroup {
            id,
            user_id,
            group_id,
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCredentialStore {
    tables: Mutex<Tables>,
    fail_group_write_at: Mutex<Option<GroupWriteStep>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend(anyhow::anyhow!("credential store lock poisoned")))
    }

    /// Make the given write of the next group transactions fail with a
    /// backend error. `None` clears the fault.
    pub fn fail_group_write_at(&self, step: Option<GroupWriteStep>) {
        if let Ok(mut fault) = self.fail_group_write_at.lock() {
            *fault = step;
        }
    }

    fn injected_fault(&self, step: GroupWriteStep) -> Result<(), StoreError> {
        let fault = self.fail_group_write_at.lock().ok().and_then(|f| *f);
        if fault == Some(step) {
            return Err(StoreError::Backend(anyhow::anyhow!(
                "injected failure at {:?}",
                step
            )));
        }
        Ok(())
    }

    /// Seed a user row under a fixed id.
    pub fn add_user_with_id(&self, id: i64, user: &NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables()?;
        if tables
            .users
            .iter()
            .any(|u| u.id == id || u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::UniqueViolation("users_email_key".to_string()));
        }
        tables.next_id = tables.next_id.max(id);
        let now = Utc::now();
        let user = User {
            id,
            uuid: user.uuid,
            username: user.username.clone(),
            email: user.email.clone(),
            password: user.password_hash.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    /// Seed a service row under a fixed id.
    pub fn add_service_with_id(&self, id: i64, service: &NewService) -> Result<Service, StoreError> {
        let mut tables = self.tables()?;
        if tables
            .services
            .iter()
            .any(|s| s.id == id || s.api_key == service.api_key)
        {
            return Err(StoreError::UniqueViolation("services_api_key_key".to_string()));
        }
        tables.next_id = tables.next_id.max(id);
        let service = Service {
            id,
            uuid: service.uuid,
            name: service.name.clone(),
            api_key: service.api_key.clone(),
            created_at: Utc::now(),
        };
        tables.services.push(service.clone());
        Ok(service)
    }

    pub fn add_operator_policy(
        &self,
        user_id: i64,
        role_id: i64,
    ) -> Result<OperatorPolicy, StoreError> {
        let mut tables = self.tables()?;
        let policy = OperatorPolicy {
            id: tables.next_id(),
            user_id,
            role_id,
        };
        tables.operator_policies.push(policy.clone());
        Ok(policy)
    }

    pub fn add_user_service(&self, user_id: i64, service_id: i64) -> Result<UserService, StoreError> {
        let mut tables = self.tables()?;
        if tables
            .user_services
            .iter()
            .any(|us| us.user_id == user_id && us.service_id == service_id)
        {
            return Err(StoreError::UniqueViolation(
                "user_services_user_id_service_id_key".to_string(),
            ));
        }
        let membership = UserService {
            id: tables.next_id(),
            user_id,
            service_id,
        };
        tables.user_services.push(membership.clone());
        Ok(membership)
    }

    /// Seed a policy under a fixed id.
    pub fn add_policy(
        &self,
        id: i64,
        user_id: i64,
        group_id: i64,
        role_id: i64,
    ) -> Result<Policy, StoreError> {
        let mut tables = self.tables()?;
        if tables
            .policies
            .iter()
            .any(|p| p.id == id || (p.user_id == user_id && p.group_id == group_id))
        {
            return Err(StoreError::UniqueViolation(
                "policies_user_id_group_id_key".to_string(),
            ));
        }
        tables.next_id = tables.next_id.max(id);
        let policy = Policy {
            id,
            name: format!("policy-{}", id),
            role_id,
            user_id,
            group_id,
        };
        tables.policies.push(policy.clone());
        Ok(policy)
    }

    /// Drop a user's policy in a group, as an operator would.
    pub fn remove_policy(&self, user_id: i64, group_id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        tables
            .policies
            .retain(|p| !(p.user_id == user_id && p.group_id == group_id));
        Ok(())
    }

    /// Revoke a service membership, as an operator would.
    pub fn remove_user_service(&self, user_id: i64, service_id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        tables
            .user_services
            .retain(|us| !(us.user_id == user_id && us.service_id == service_id));
        Ok(())
    }

    pub fn groups_named(&self, name: &str) -> Result<Vec<Group>, StoreError> {
        Ok(self
            .tables()?
            .groups
            .iter()
            .filter(|g| g.name == name)
            .cloned()
            .collect())
    }

    pub fn group_count(&self) -> Result<usize, StoreError> {
        Ok(self.tables()?.groups.len())
    }

    pub fn service_group_links(&self, group_id: i64) -> Result<Vec<ServiceGroup>, StoreError> {
        Ok(self
            .tables()?
            .service_groups
            .iter()
            .filter(|sg| sg.group_id == group_id)
            .cloned()
            .collect())
    }

    pub fn service_group_count(&self) -> Result<usize, StoreError> {
        Ok(self.tables()?.service_groups.len())
    }

    pub fn user_group_links(&self, group_id: i64) -> Result<Vec<UserGroup>, StoreError> {
        Ok(self
            .tables()?
            .user_groups
            .iter()
            .filter(|ug| ug.group_id == group_id)
            .cloned()
            .collect())
    }

    pub fn user_group_count(&self) -> Result<usize, StoreError> {
        Ok(self.tables()?.user_groups.len())
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .tables()?
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        Ok(self
            .tables()?
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned())
    }

    async fn find_operator_policy(
        &self,
        user_id: i64,
        role_id: i64,
    ) -> Result<Option<OperatorPolicy>, StoreError> {
        Ok(self
            .tables()?
            .operator_policies
            .iter()
            .find(|p| p.user_id == user_id && p.role_id == role_id)
            .cloned())
    }

    async fn find_user_service(
        &self,
        user_id: i64,
        service_id: i64,
    ) -> Result<Option<UserService>, StoreError> {
        Ok(self
            .tables()?
            .user_services
            .iter()
            .find(|us| us.user_id == user_id && us.service_id == service_id)
            .cloned())
    }

    async fn find_policy(
        &self,
        user_id: i64,
        group_id: i64,
    ) -> Result<Option<Policy>, StoreError> {
        Ok(self
            .tables()?
            .policies
            .iter()
            .find(|p| p.user_id == user_id && p.group_id == group_id)
            .cloned())
    }

    async fn find_service_by_api_key(
        &self,
        api_key: &str,
    ) -> Result<Option<Service>, StoreError> {
        Ok(self
            .tables()?
            .services
            .iter()
            .find(|s| s.api_key == api_key)
            .cloned())
    }

    async fn insert_user(&self, user: &NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables()?;
        if tables
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::UniqueViolation("users_email_key".to_string()));
        }
        let now = Utc::now();
        let user = User {
            id: tables.next_id(),
            uuid: user.uuid,
            username: user.username.clone(),
            email: user.email.clone(),
            password: user.password_hash.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn insert_service(&self, service: &NewService) -> Result<Service, StoreError> {
        let mut tables = self.tables()?;
        if tables.services.iter().any(|s| s.api_key == service.api_key) {
            return Err(StoreError::UniqueViolation("services_api_key_key".to_string()));
        }
        let service = Service {
            id: tables.next_id(),
            uuid: service.uuid,
            name: service.name.clone(),
            api_key: service.api_key.clone(),
            created_at: Utc::now(),
        };
        tables.services.push(service.clone());
        Ok(service)
    }

    async fn insert_group_with_links(
        &self,
        group: &NewGroup,
        service_id: i64,
        user_id: i64,
    ) -> Result<Group, StoreError> {
        let mut tables = self.tables()?;

        // Work on a copy and publish it only once all three writes succeeded.
        let mut tx = tables.clone();

        self.injected_fault(GroupWriteStep::Group)?;
        let created = tx.insert_group(service_id, &group.name)?;

        self.injected_fault(GroupWriteStep::ServiceGroup)?;
        tx.insert_service_group(service_id, created.id)?;

        self.injected_fault(GroupWriteStep::UserGroup)?;
        tx.insert_user_group(user_id, created.id)?;

        *tables = tx;
        Ok(created)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.tables().map(|_| ())
    }
}
