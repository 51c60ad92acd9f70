//! Resolution of the three authorization scopes: operator role, service
//! membership and per-group policy.

use service_core::error::AppError;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{OperatorPolicy, Scope, OPERATOR_ROLE_ID};
use crate::store::{with_timeout, CredentialStore};

/// Role and policy a user holds inside one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupGrant {
    pub role_id: i64,
    pub policy_id: i64,
}

/// Scope claimed by a token, to be checked against current store state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimedScope {
    pub user_id: i64,
    pub role_id: i64,
    pub service_id: i64,
}

#[derive(Clone)]
pub struct PolicyResolver {
    store: Arc<dyn CredentialStore>,
    timeout: Duration,
}

impl PolicyResolver {
    pub fn new(store: Arc<dyn CredentialStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Role and policy of `user_id` in `group_id`.
    ///
    /// `Ok(None)` means the user holds no role in that group. Whether that is
    /// an error is the caller's decision.
    pub async fn resolve(
        &self,
        user_id: i64,
        group_id: i64,
    ) -> Result<Option<GroupGrant>, AppError> {
        let policy =
            with_timeout(self.timeout, self.store.find_policy(user_id, group_id)).await?;

        Ok(policy.map(|p| GroupGrant {
            role_id: p.role_id,
            policy_id: p.id,
        }))
    }

    /// The user's operator policy, if they hold the operator role.
    pub async fn operator_policy(&self, user_id: i64) -> Result<Option<OperatorPolicy>, AppError> {
        let policy = with_timeout(
            self.timeout,
            self.store.find_operator_policy(user_id, OPERATOR_ROLE_ID),
        )
        .await?;

        Ok(policy.filter(OperatorPolicy::is_operator))
    }

    /// Whether the claimed scope still holds.
    ///
    /// Operator tokens need an operator policy for the claimed role, and that
    /// role must be the operator role. User tokens need a membership in the
    /// claimed service.
    pub async fn holds(&self, scope: Scope, claimed: ClaimedScope) -> Result<bool, AppError> {
        match scope {
            Scope::Operator => {
                if claimed.role_id != OPERATOR_ROLE_ID {
                    return Ok(false);
                }
                let policy = with_timeout(
                    self.timeout,
                    self.store
                        .find_operator_policy(claimed.user_id, claimed.role_id),
                )
                .await?;
                Ok(policy.is_some())
            }
            Scope::User => {
                let membership = with_timeout(
                    self.timeout,
                    self.store
                        .find_user_service(claimed.user_id, claimed.service_id),
                )
                .await?;
                Ok(membership.is_some())
            }
        }
    }
}
