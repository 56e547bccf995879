//! Folder tree operations: CRUD, listings, upload paths and zip export.

pub mod export;
pub mod service;
pub mod tree;

pub use export::{FolderExport, ZipDownload};
pub use service::{CreateFolderRequest, FolderService, RenameRequest};
pub use tree::{ContentCounts, FileEntry, FolderContents, FolderInfo, FolderSummary, SubfolderEntry};
