//! Permission domain entities: roles, resource types, and grants.

pub mod grant;
pub mod resource;
pub mod role;

pub use grant::{Grant, NewGrant};
pub use resource::ResourceType;
pub use role::ShareRole;
