//! # feedwire-hubbub
//!
//! Keeps the server registered as a callback target with each feed's
//! push hub. Subscribe and unsubscribe handshakes run on short-lived
//! tasks; their outcomes are applied to the active subscription set by a
//! single owner task, which also drives lease renewal.

pub mod error;
pub mod handshake;
pub mod manager;
pub mod monitor;
pub mod renewal;

pub use error::{HubbubError, HubbubResult};
pub use handshake::{HubClient, HubMode};
pub use manager::Hubbub;
pub use renewal::needs_renewal;
