//! Core type definitions used across the PhynixDrive workspace.

pub mod pagination;

pub use pagination::{PageRequest, PageResponse};
