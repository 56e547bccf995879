//! User provisioning from trusted identity.

pub mod service;

pub use service::UserService;
