//! # feedwire-auth
//!
//! Bearer credential handling for long-lived event streams.
//!
//! ## Modules
//!
//! - `jwt`: claims, token decoding and signing
//! - `revocation`: revoked-token store interface and its in-memory implementation

pub mod jwt;
pub mod revocation;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
pub use revocation::{MemoryTokenStore, TokenStore};
