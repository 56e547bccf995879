//! OAuth `state` parameter storage.

pub mod state;

pub use state::OAuthStateStore;
