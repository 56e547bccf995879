//! Trash lifecycle: listing, restore, purge and the retention sweep.

pub mod service;

pub use service::{
    PurgeReport, RestoreOutcome, RestoreResult, RestoreTarget, TrashListing, TrashQuery, TrashService,
};
