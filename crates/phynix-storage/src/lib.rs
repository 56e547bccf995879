//! # phynix-storage
//!
//! Blob storage for PhynixDrive. Providers implement
//! [`phynix_core::traits::StorageProvider`]; download and preview links are
//! short-lived HS256 tokens served back through the API.

pub mod manager;
pub mod providers;
pub mod signed;

pub use manager::StorageManager;
pub use providers::{LocalStorageProvider, MemoryStorageProvider};
pub use signed::{BlobClaims, SignedUrlIssuer};
