//! # api-adapters
//!
//! The HTTP transport of the forum service. Request decoding and status
//! mapping live here; everything else is delegated to `services`.
//! The axum router is compiled in with the `web-axum` feature.

pub mod query;

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod router;

#[cfg(feature = "web-axum")]
pub use error::ApiError;
#[cfg(feature = "web-axum")]
pub use handlers::AppState;
#[cfg(feature = "web-axum")]
pub use router::router;
