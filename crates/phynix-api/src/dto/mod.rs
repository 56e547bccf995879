//! Request and response DTOs that only exist at the HTTP boundary.

pub mod request;
pub mod response;

pub use request::{LimitQuery, RecentQuery, TypeQuery};
pub use response::ApiResponse;
