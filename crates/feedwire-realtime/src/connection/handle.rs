//! A single registered event stream.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use feedwire_core::types::FeedId;

use super::validator::ConnectionValidator;

/// Unique connection identifier.
pub type ConnectionId = Uuid;

/// Opaque registry key, normally the peer socket address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionKey(String);

impl ConnectionKey {
    /// A key that collides with nothing.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// String form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<SocketAddr> for ConnectionKey {
    fn from(addr: SocketAddr) -> Self {
        Self(addr.to_string())
    }
}

impl From<String> for ConnectionKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for ConnectionKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// Why a delivery to one stream failed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The write or flush returned an error.
    #[error("stream write failed: {0}")]
    Write(#[from] io::Error),
    /// The write and flush did not complete in time.
    #[error("stream write timed out after {0:?}")]
    TimedOut(Duration),
}

/// Writer end of a stream. Exclusively used by the registry owner.
pub type StreamWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// A live stream as held by the registry owner task.
pub struct Connection {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Registry key.
    pub key: ConnectionKey,
    /// Feeds this stream wants updates for.
    pub feeds: HashSet<FeedId>,
    writer: StreamWriter,
    validator: Arc<dyn ConnectionValidator>,
    terminated: CancellationToken,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("feeds", &self.feeds.len())
            .field("terminated", &self.terminated.is_cancelled())
            .finish()
    }
}

impl Connection {
    /// Create a connection.
    pub fn new(
        id: ConnectionId,
        key: ConnectionKey,
        writer: StreamWriter,
        validator: Arc<dyn ConnectionValidator>,
        feeds: HashSet<FeedId>,
        terminated: CancellationToken,
    ) -> Self {
        Self {
            id,
            key,
            feeds,
            writer,
            validator,
            terminated,
        }
    }

    /// Whether the stream wants updates for `feed_id`.
    pub fn is_interested(&self, feed_id: FeedId) -> bool {
        self.feeds.contains(&feed_id)
    }

    /// Re-check the stream's authorization. The returned future does not
    /// borrow the connection.
    pub fn is_authorized(&self) -> impl Future<Output = bool> + Send + 'static {
        let validator = Arc::clone(&self.validator);
        async move { validator.is_valid().await }
    }

    /// Whether the termination signal has fired.
    pub fn is_terminated(&self) -> bool {
        self.terminated.is_cancelled()
    }

    /// Fire the termination signal. Idempotent.
    pub fn terminate(&self) {
        self.terminated.cancel();
    }

    /// Write and flush one frame, bounded by `timeout`.
    pub async fn deliver(&mut self, frame: &[u8], timeout: Duration) -> Result<(), DeliveryError> {
        let writer = &mut self.writer;
        let write = async move {
            writer.write_all(frame).await?;
            writer.flush().await
        };

        match tokio::time::timeout(timeout, write).await {
            Ok(result) => result.map_err(DeliveryError::from),
            Err(_) => Err(DeliveryError::TimedOut(timeout)),
        }
    }
}
