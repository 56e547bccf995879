//! Core traits defined in `phynix-core` and implemented by other crates.

pub mod storage;

pub use storage::{ByteStream, StorageProvider};
