//! # phynix-service
//!
//! Business logic service layer for PhynixDrive. Each service orchestrates
//! the metadata stores, the blob storage provider and the permission
//! resolver to implement one group of use cases.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod context;
pub mod file;
pub mod folder;
pub mod notification;
pub mod search;
pub mod share;
pub mod trash;
pub mod user;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use context::RequestContext;
pub use file::{FileLink, FileService, UploadItem, UploadRequest};
pub use folder::{FolderExport, FolderService, ZipDownload};
pub use notification::NotificationService;
pub use search::SearchService;
pub use share::ShareService;
pub use trash::TrashService;
pub use user::UserService;
