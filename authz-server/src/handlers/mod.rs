pub mod fallback;
pub mod group;
pub mod operator;
pub mod token;
pub mod user;

pub use fallback::{method_not_allowed, not_found};
pub use group::create_group;
pub use operator::create_service;
pub use token::issue_token;
pub use user::register;
