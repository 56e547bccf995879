//! # phynix-core
//!
//! Core crate for PhynixDrive. Contains the storage provider trait,
//! configuration schemas, pagination types, and the unified error system.
//!
//! This crate has **no** internal dependencies on other PhynixDrive crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
