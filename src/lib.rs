//! Subcover - subtitle coverage reconciliation for media-library views
//!
//! This library crate composes the `sc-*` crates into a library view
//! controller and shared application state, and is used by the `subcover`
//! binary and the integration tests.

pub mod library;
pub mod report;
pub mod state;

pub use library::{Backend, LibraryView, Notice, NoticeLevel, Row, ViewStatus};
pub use state::AppState;
