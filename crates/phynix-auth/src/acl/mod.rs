//! Permission resolution with folder inheritance.

pub mod inheritance;
pub mod resolver;

pub use inheritance::AclInheritanceResolver;
pub use resolver::{EffectivePermission, EffectivePermissionResolver, PermissionSource};
