//! Event envelopes and wire framing.

pub mod serializer;
pub mod types;

pub use types::{Event, FEED_UPDATE};
