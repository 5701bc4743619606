//! # feedwire-realtime
//!
//! In-process fan-out of feed update events to long-lived server-sent
//! event streams.
//!
//! - `connection`: registered streams, their keys and revalidation hooks
//! - `hub`: the [`EventHub`] handle and the task that owns the registry
//! - `message`: event envelopes and SSE framing

pub mod connection;
pub mod hub;
pub mod message;
pub mod monitor;

pub use connection::{ConnectionId, ConnectionKey, ConnectionValidator, validator_fn};
pub use hub::{EventHub, Registration};
pub use message::types::Event;
