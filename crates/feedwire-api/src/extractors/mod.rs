//! Custom Axum extractors.

pub mod auth;
pub mod peer;

pub use auth::AuthUser;
pub use peer::ClientKey;
