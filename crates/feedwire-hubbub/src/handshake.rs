//! Outbound subscription handshake with a push hub.

use std::fmt;

use reqwest::{StatusCode, header};
use tracing::{debug, info};

use feedwire_core::config::TimeoutConfig;
use feedwire_core::types::FeedId;

use crate::error::{HubbubError, HubbubResult};

/// Value of the `hub.mode` form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubMode {
    /// Register the callback.
    Subscribe,
    /// Remove the callback.
    Unsubscribe,
}

impl HubMode {
    /// Wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
        }
    }
}

impl fmt::Display for HubMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP client for hub handshakes.
#[derive(Debug, Clone)]
pub struct HubClient {
    http: reqwest::Client,
    from: String,
}

impl HubClient {
    /// Build a client honouring the configured timeouts. `from` is sent
    /// as the `From` header on every request.
    pub fn new(timeouts: &TimeoutConfig, from: impl Into<String>) -> HubbubResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeouts.connect())
            .timeout(timeouts.connect() + timeouts.read_write())
            .build()
            .map_err(HubbubError::Client)?;

        Ok(Self {
            http,
            from: from.into(),
        })
    }

    /// Post a form-encoded handshake to `hub`. Only 202 Accepted counts
    /// as success.
    pub async fn send(
        &self,
        hub: &str,
        mode: HubMode,
        callback: &str,
        topic: &str,
        feed_id: FeedId,
    ) -> HubbubResult<()> {
        info!(feed_id = %feed_id, hub = %hub, mode = %mode, callback = %callback, "Sending hub handshake");

        let response = self
            .http
            .post(hub)
            .header(header::FROM, &self.from)
            .form(&[
                ("hub.callback", callback),
                ("hub.mode", mode.as_str()),
                ("hub.topic", topic),
            ])
            .send()
            .await
            .map_err(|source| HubbubError::Transport {
                feed_id,
                hub: hub.to_string(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::ACCEPTED {
            return Err(HubbubError::UnexpectedStatus {
                feed_id,
                hub: hub.to_string(),
                status,
            });
        }

        debug!(feed_id = %feed_id, hub = %hub, "Hub accepted handshake");
        Ok(())
    }
}
