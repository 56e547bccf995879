//! Sharing: grants between users and resources, and the share history.

pub mod service;
pub mod views;

pub use service::{BulkShareRequest, BulkShareResource, ShareRequest, ShareService, UpdateShareRequest};
pub use views::{
    BulkShareError, BulkShareResponse, BulkShareSummary, PermissionInfo, ShareResponse,
    SharedResource, SharedResourcesResponse,
};
