//! Policy models - the role bindings tokens are scoped by.

use sqlx::FromRow;

/// Role id reserved for platform operators. Only an operator policy carrying
/// this role authorizes operator tokens.
pub const OPERATOR_ROLE_ID: i64 = 1;

/// Binds a user to a role inside one group. Unique per (user, group).
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Policy {
    pub id: i64,
    pub name: String,
    pub role_id: i64,
    pub user_id: i64,
    pub group_id: i64,
}

/// Binds a user to a role at platform level, outside any service or group.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct OperatorPolicy {
    pub id: i64,
    pub user_id: i64,
    pub role_id: i64,
}

impl OperatorPolicy {
    pub fn is_operator(&self) -> bool {
        self.role_id == OPERATOR_ROLE_ID
    }
}
