//! Share record entities.

pub mod model;

pub use model::{NewShare, Share};
