pub mod cache_timer;
pub mod group;
pub mod policy;
pub mod token;

pub use cache_timer::{CacheUpdater, NoopCacheUpdater, UpdateTimer};
pub use group::GroupProvisioner;
pub use policy::{ClaimedScope, GroupGrant, PolicyResolver};
pub use token::{bearer_token, parse_group_id, IssuedToken, TokenClaims, TokenEngine};
