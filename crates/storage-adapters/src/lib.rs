//! # Storage adapters
//!
//! Implementations of the `domains` port traits.
//!
//! - [`memory`]: a process-local store, always compiled. Used by tests and by
//!   the server when `database.backend = "memory"`.
//! - `postgres`: sqlx-backed store behind the `db-postgres` feature, with the
//!   schema migrations under `migrations/`.

pub mod memory;

#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use memory::MemoryStore;

#[cfg(feature = "db-postgres")]
pub use postgres::PgStore;
