//! File operations: upload, metadata, signed links, versions.

pub mod service;
pub mod upload;

pub use service::{FileLink, FileService};
pub use upload::{UploadItem, UploadRequest};
