//! Trash view types.

pub mod item;

pub use item::TrashItem;
