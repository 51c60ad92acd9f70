//! Entities of the credential store plus the request-scoped authorization
//! values derived from them.

mod auth;
mod group;
mod policy;
mod service;
mod user;

pub use auth::{AuthUser, RequestContext, Scope, API_KEY_HEADER};
pub use group::{Group, NewGroup, ServiceGroup, UserGroup};
pub use policy::{OperatorPolicy, Policy, OPERATOR_ROLE_ID};
pub use service::{NewService, Service, ServiceResponse, UserService};
pub use user::{NewUser, User, UserResponse};
