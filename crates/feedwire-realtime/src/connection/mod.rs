//! Registered event streams.

pub mod handle;
pub mod validator;

pub use handle::{Connection, ConnectionId, ConnectionKey, DeliveryError, StreamWriter};
pub use validator::{ConnectionValidator, validator_fn};
