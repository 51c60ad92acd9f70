use service_core::error::AppError;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{Group, NewGroup};
use crate::store::{with_timeout, CredentialStore, StoreError};
use crate::utils::non_blank_name;

/// Creates groups together with the links to the service and user that
/// requested them.
#[derive(Clone)]
pub struct GroupProvisioner {
    store: Arc<dyn CredentialStore>,
    timeout: Duration,
}

impl GroupProvisioner {
    pub fn new(store: Arc<dyn CredentialStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Insert the group, its service link and its user link atomically.
    ///
    /// Names are trimmed and must not be blank. They are unique per service,
    /// so a uniqueness violation on any of the three writes is a `Conflict`;
    /// every other store failure is a 500 with the detail kept in the logs.
    pub async fn create_group_with_links(
        &self,
        name: &str,
        service_id: i64,
        user_id: i64,
    ) -> Result<Group, AppError> {
        let new_group = NewGroup {
            name: non_blank_name(name)?.to_string(),
        };

        let result = with_timeout(
            self.timeout,
            self.store
                .insert_group_with_links(&new_group, service_id, user_id),
        )
        .await;

        match result {
            Ok(group) => {
                tracing::info!(
                    group_id = group.id,
                    service_id,
                    user_id,
                    "Group created with service and user links"
                );
                Ok(group)
            }
            Err(StoreError::UniqueViolation(constraint)) => {
                tracing::info!(
                    constraint = %constraint,
                    service_id,
                    user_id,
                    "Group already exists"
                );
                Err(AppError::conflict("Already exists"))
            }
            Err(e) => {
                tracing::error!(error = %e, service_id, user_id, "Failed to create group");
                Err(e.into())
            }
        }
    }
}
