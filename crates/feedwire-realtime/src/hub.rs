//! Event broadcast hub.
//!
//! The connection registry lives inside one owner task. Every mutation
//! and every broadcast visit arrives as an [`Operation`] on an unbounded
//! queue and is executed strictly in submission order, so a stalled
//! stream delays everything queued behind it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use feedwire_core::config::RealtimeConfig;
use feedwire_core::result::AppResult;
use feedwire_core::types::FeedId;
use feedwire_entity::{Article, Feed};

use crate::connection::{
    Connection, ConnectionId, ConnectionKey, ConnectionValidator, StreamWriter,
};
use crate::message::serializer::sse_frame;
use crate::message::types::Event;

/// Unit of work executed by the registry owner.
enum Operation {
    Register(Connection),
    Deregister(ConnectionKey),
    /// Drop a connection only if `key` still maps to `id`.
    Release {
        key: ConnectionKey,
        id: ConnectionId,
    },
    FeedUpdated {
        feed_id: FeedId,
        frame: Bytes,
    },
    Count(oneshot::Sender<usize>),
}

/// Handle to the broadcast hub. Cheap to clone.
#[derive(Clone)]
pub struct EventHub {
    ops: mpsc::UnboundedSender<Operation>,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("closed", &self.ops.is_closed())
            .finish()
    }
}

impl EventHub {
    /// Spawn the registry owner task. It stops, terminating every stream,
    /// when `shutdown` is cancelled.
    pub fn start(config: &RealtimeConfig, shutdown: CancellationToken) -> Self {
        let (ops, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_owner(rx, config.write_timeout(), shutdown.clone()));
        info!("Event hub started");
        Self { ops, shutdown }
    }

    /// Register a stream.
    ///
    /// `writer` belongs to the hub from now on. A stream already
    /// registered under `key` is replaced and terminated. Wait on
    /// [`Registration::terminated`] to learn when to stop serving.
    pub fn register(
        &self,
        key: ConnectionKey,
        writer: StreamWriter,
        validator: Arc<dyn ConnectionValidator>,
        feeds: HashSet<FeedId>,
    ) -> Registration {
        let id = Uuid::new_v4();
        let terminated = self.shutdown.child_token();
        let connection = Connection::new(
            id,
            key.clone(),
            writer,
            validator,
            feeds,
            terminated.clone(),
        );

        if self.ops.send(Operation::Register(connection)).is_err() {
            terminated.cancel();
        }

        Registration {
            id,
            key,
            terminated,
            ops: self.ops.clone(),
        }
    }

    /// Remove the stream registered under `key`, if any.
    pub fn deregister(&self, key: &ConnectionKey) {
        let _ = self.ops.send(Operation::Deregister(key.clone()));
    }

    /// Queue a `feed-update` event for every stream interested in `feed`.
    pub fn notify_feed_updated(&self, feed: &Feed, articles: &[Article]) -> AppResult<()> {
        let frame = sse_frame(&Event::feed_update(feed, articles)?)?;
        debug!(feed_id = %feed.id, articles = articles.len(), "Queueing feed update");
        let _ = self.ops.send(Operation::FeedUpdated {
            feed_id: feed.id,
            frame,
        });
        Ok(())
    }

    /// Number of registered streams, answered after every operation queued
    /// before this call has run.
    pub async fn connection_count(&self) -> usize {
        let (tx, rx) = oneshot::channel();
        if self.ops.send(Operation::Count(tx)).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

/// A registered stream as seen by its HTTP handler.
///
/// Dropping it releases the registry entry unless the key has since
/// been taken over by a newer stream.
pub struct Registration {
    id: ConnectionId,
    key: ConnectionKey,
    terminated: CancellationToken,
    ops: mpsc::UnboundedSender<Operation>,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("key", &self.key)
            .finish()
    }
}

impl Registration {
    /// Connection id.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Registry key.
    pub fn key(&self) -> &ConnectionKey {
        &self.key
    }

    /// Fires on revocation, write failure, replacement, or shutdown.
    pub fn terminated(&self) -> &CancellationToken {
        &self.terminated
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let _ = self.ops.send(Operation::Release {
            key: self.key.clone(),
            id: self.id,
        });
    }
}

async fn run_owner(
    mut ops: mpsc::UnboundedReceiver<Operation>,
    write_timeout: Duration,
    shutdown: CancellationToken,
) {
    let mut registry: HashMap<ConnectionKey, Connection> = HashMap::new();

    loop {
        let op = tokio::select! {
            _ = shutdown.cancelled() => break,
            op = ops.recv() => match op {
                Some(op) => op,
                None => break,
            },
        };

        match op {
            Operation::Register(connection) => {
                info!(key = %connection.key, conn_id = %connection.id, feeds = connection.feeds.len(), "Stream registered");
                if let Some(previous) = registry.insert(connection.key.clone(), connection) {
                    debug!(key = %previous.key, conn_id = %previous.id, "Replacing stream with the same key");
                    previous.terminate();
                }
            }
            Operation::Deregister(key) => {
                if let Some(connection) = registry.remove(&key) {
                    info!(key = %key, conn_id = %connection.id, "Stream deregistered");
                    connection.terminate();
                }
            }
            Operation::Release { key, id } => {
                if registry.get(&key).is_some_and(|c| c.id == id) {
                    if let Some(connection) = registry.remove(&key) {
                        debug!(key = %key, conn_id = %id, "Stream released");
                        connection.terminate();
                    }
                }
            }
            Operation::FeedUpdated { feed_id, frame } => {
                broadcast(&mut registry, feed_id, &frame, write_timeout).await;
            }
            Operation::Count(reply) => {
                let _ = reply.send(registry.len());
            }
        }
    }

    for connection in registry.values() {
        connection.terminate();
    }
    info!(streams = registry.len(), "Event hub stopped");
}

/// Visit every interested stream in turn.
async fn broadcast(
    registry: &mut HashMap<ConnectionKey, Connection>,
    feed_id: FeedId,
    frame: &[u8],
    write_timeout: Duration,
) {
    let mut dead = Vec::new();

    for connection in registry.values_mut() {
        if connection.is_terminated() {
            dead.push(connection.key.clone());
            continue;
        }
        if !connection.is_interested(feed_id) {
            continue;
        }

        if !connection.is_authorized().await {
            info!(key = %connection.key, conn_id = %connection.id, "Stream authorization no longer valid");
            connection.terminate();
            dead.push(connection.key.clone());
            continue;
        }

        match connection.deliver(frame, write_timeout).await {
            Ok(()) => debug!(key = %connection.key, feed_id = %feed_id, "Feed update delivered"),
            Err(e) => {
                warn!(key = %connection.key, conn_id = %connection.id, error = %e, "Stream delivery failed");
                connection.terminate();
                dead.push(connection.key.clone());
            }
        }
    }

    for key in dead {
        registry.remove(&key);
    }
}
