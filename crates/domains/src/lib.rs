//! domains/src/lib.rs
//!
//! The central domain model and port definitions for the forum service.
//! Nothing in this crate performs I/O: storage and transport live behind the
//! traits in [`ports`], implemented by `storage-adapters` and driven by
//! `services`.

pub mod errors;
pub mod models;
pub mod paging;
pub mod path;
pub mod ports;
pub mod voting;

// Re-exporting for easier access in other crates
pub use errors::*;
pub use models::*;
pub use paging::{Cursor, Direction, PagePlan, PostListing, SortMode};
pub use path::{Placement, PostPath};
pub use ports::*;
pub use voting::Voice;
