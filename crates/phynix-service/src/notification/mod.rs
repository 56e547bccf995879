//! Share notifications.

pub mod service;

pub use service::{NotificationService, ShareNotice};
