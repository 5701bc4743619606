//! Event stream configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Server-sent event stream settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Size of the in-memory pipe between the broadcaster and a stream's
    /// HTTP body. Once full, writes to that stream wait for the client.
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer_bytes: usize,
    /// Upper bound for a single write and flush to one stream.
    #[serde(default = "default_write_timeout")]
    pub write_timeout_seconds: u64,
}

impl RealtimeConfig {
    /// Returns the per-stream write timeout.
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_seconds)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            stream_buffer_bytes: default_stream_buffer(),
            write_timeout_seconds: default_write_timeout(),
        }
    }
}

fn default_stream_buffer() -> usize {
    16 * 1024
}

fn default_write_timeout() -> u64 {
    10
}
