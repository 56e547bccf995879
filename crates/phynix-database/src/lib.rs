//! # phynix-database
//!
//! Metadata persistence for PhynixDrive: the store traits the services
//! depend on, their PostgreSQL repositories, and a process-local store
//! with the same transactional guarantees.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use store::{FileStore, FolderStore, NotificationStore, ShareStore, Stores, SubtreeChange, UserStore};
