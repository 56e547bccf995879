//! File domain entities.

pub mod mime;
pub mod model;
pub mod version;

pub use mime::{is_previewable, mime_from_name};
pub use model::{CreateFile, File};
pub use version::FileVersion;
