//! Push hub (WebSub / PubSubHubbub) subscription configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Push hub subscription settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubbubConfig {
    /// Absolute base URL hubs use to reach this server. Empty disables
    /// push subscriptions entirely.
    #[serde(default)]
    pub callback_url: String,
    /// Value of the `From` header sent with every hub request.
    #[serde(default = "default_from")]
    pub from: String,
    /// Path prefix of the callback endpoint; the feed id is appended.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Lease assumed after an accepted handshake until the hub reports one.
    #[serde(default = "default_lease")]
    pub default_lease_seconds: u64,
    /// Capacity of the channel handing failed feeds back to the poller.
    #[serde(default = "default_resume_buffer")]
    pub resume_buffer: usize,
}

impl HubbubConfig {
    /// Whether a callback URL has been set at all.
    pub fn is_configured(&self) -> bool {
        !self.callback_url.trim().is_empty()
    }
}

impl Default for HubbubConfig {
    fn default() -> Self {
        Self {
            callback_url: String::new(),
            from: default_from(),
            endpoint: default_endpoint(),
            default_lease_seconds: default_lease(),
            resume_buffer: default_resume_buffer(),
        }
    }
}

/// Feed update scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedManagerConfig {
    /// Interval between feed updates; also drives subscription renewal.
    #[serde(default = "default_update_interval")]
    pub update_interval_seconds: u64,
}

impl FeedManagerConfig {
    /// Returns the update interval as a duration.
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_seconds.max(1))
    }
}

impl Default for FeedManagerConfig {
    fn default() -> Self {
        Self {
            update_interval_seconds: default_update_interval(),
        }
    }
}

/// Outbound HTTP timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// TCP connect timeout in seconds.
    #[serde(default = "default_connect")]
    pub connect_seconds: u64,
    /// Total read/write timeout in seconds.
    #[serde(default = "default_read_write")]
    pub read_write_seconds: u64,
}

impl TimeoutConfig {
    /// Returns the connect timeout.
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_seconds)
    }

    /// Returns the read/write timeout.
    pub fn read_write(&self) -> Duration {
        Duration::from_secs(self.read_write_seconds)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_seconds: default_connect(),
            read_write_seconds: default_read_write(),
        }
    }
}

fn default_from() -> String {
    "feedwire".to_string()
}

fn default_endpoint() -> String {
    "/v2/hubbub".to_string()
}

fn default_lease() -> u64 {
    10 * 24 * 60 * 60
}

fn default_resume_buffer() -> usize {
    64
}

fn default_update_interval() -> u64 {
    30 * 60
}

fn default_connect() -> u64 {
    1
}

fn default_read_write() -> u64 {
    2
}
