//! # feedwire-api
//!
//! HTTP boundary built on Axum: the server-sent event stream, the push
//! hub callback endpoint, and a health probe.

pub mod content;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
