//! # phynix-auth
//!
//! Access decisions and request identity for PhynixDrive.
//!
//! ## Modules
//!
//! - `acl`: role resolution over grants with folder inheritance
//! - `jwt`: bearer token claims, validation and issuance
//! - `oauth`: single-use OAuth state tokens with TTL eviction

pub mod acl;
pub mod jwt;
pub mod oauth;

pub use acl::{AclInheritanceResolver, EffectivePermission, EffectivePermissionResolver, PermissionSource};
pub use jwt::{Claims, JwtDecoder, JwtEncoder};
pub use oauth::OAuthStateStore;
