//! # phynix-entity
//!
//! Domain entity models for PhynixDrive. Every struct in this crate
//! represents a database table row or a domain value object. All entities
//! derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and database
//! entities additionally derive `sqlx::FromRow`.

pub mod file;
pub mod folder;
pub mod notification;
pub mod permission;
pub mod share;
pub mod trash;
pub mod user;
