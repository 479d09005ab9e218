//! Topic-based pub/sub fan-out with per-subscriber backpressure tolerance.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// Default outstanding-bytes cutoff for a subscriber's send queue.
pub const DEFAULT_BACKPRESSURE_BYTES: usize = 1_048_576;

/// Identifies a single subscriber connection.
pub type ConnectionId = Uuid;

/// A frame queued for delivery to one subscriber.
///
/// Carries its own byte length so the registry can track outstanding bytes
/// without re-measuring the payload, and the connection decrements the
/// counter once the frame has actually been flushed to the socket.
#[derive(Debug, Clone)]
pub struct Frame {
    pub bytes: Arc<[u8]>,
}

impl Frame {
    #[must_use]
    pub fn new(bytes: Arc<[u8]>) -> Self {
        Self { bytes }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Outcome of a single [`TopicRegistry::broadcast`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastStats {
    pub delivered: usize,
    pub skipped: usize,
}

struct Connection {
    sender: mpsc::UnboundedSender<Frame>,
    outstanding: Arc<AtomicUsize>,
    topics: HashSet<String>,
}

/// Registers subscriber connections against topics and fans out broadcast
/// payloads to each open, non-backpressured subscriber.
///
/// A single mutex guards both the topic index and the connection table;
/// broadcast serialization itself happens outside any lock, so the critical
/// section here is pointer-chasing and channel sends, never JSON encoding.
pub struct TopicRegistry {
    backpressure_bytes: usize,
    topics: Mutex<HashMap<String, HashSet<ConnectionId>>>,
    connections: Mutex<HashMap<ConnectionId, Connection>>,
}

/// Handle returned on [`TopicRegistry::register`]; the caller's send loop
/// reads from `receiver` and must decrement `outstanding` by the frame's
/// length after it is actually written to the socket.
pub struct Registration {
    pub receiver: mpsc::UnboundedReceiver<Frame>,
    pub outstanding: Arc<AtomicUsize>,
}

impl TopicRegistry {
    #[must_use]
    pub fn new(backpressure_bytes: usize) -> Self {
        Self {
            backpressure_bytes,
            topics: Mutex::new(HashMap::new()),
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new connection, returning the channel its send loop should
    /// drain and the shared outstanding-bytes counter for that loop to
    /// decrement as frames are flushed.
    #[must_use]
    pub fn register(&self, connection: ConnectionId) -> Registration {
        let (sender, receiver) = mpsc::unbounded_channel();
        let outstanding = Arc::new(AtomicUsize::new(0));
        #[allow(clippy::expect_used)]
        let mut connections = self.connections.lock().expect("bus mutex poisoned");
        connections.insert(
            connection,
            Connection {
                sender,
                outstanding: Arc::clone(&outstanding),
                topics: HashSet::new(),
            },
        );
        Registration {
            receiver,
            outstanding,
        }
    }

    /// Idempotently subscribe `connection` to `topic`.
    pub fn subscribe(&self, connection: ConnectionId, topic: &str) {
        #[allow(clippy::expect_used)]
        let mut connections = self.connections.lock().expect("bus mutex poisoned");
        let Some(entry) = connections.get_mut(&connection) else {
            return;
        };
        entry.topics.insert(topic.to_string());
        drop(connections);

        #[allow(clippy::expect_used)]
        let mut topics = self.topics.lock().expect("bus mutex poisoned");
        topics.entry(topic.to_string()).or_default().insert(connection);
    }

    /// Remove `connection` from every topic it held and from the connection
    /// table, deleting any topic left with no subscribers. Called on
    /// connection close.
    pub fn unsubscribe_all(&self, connection: ConnectionId) {
        #[allow(clippy::expect_used)]
        let mut connections = self.connections.lock().expect("bus mutex poisoned");
        let Some(entry) = connections.remove(&connection) else {
            return;
        };
        drop(connections);

        #[allow(clippy::expect_used)]
        let mut topics = self.topics.lock().expect("bus mutex poisoned");
        for topic in &entry.topics {
            if let Some(subscribers) = topics.get_mut(topic) {
                subscribers.remove(&connection);
                if subscribers.is_empty() {
                    topics.remove(topic);
                }
            }
        }
    }

    /// Broadcast a pre-serialized payload to every open, non-backpressured
    /// subscriber of `topic`. Subscribers at or above the backpressure
    /// threshold are skipped for this payload rather than blocked on.
    pub fn broadcast(&self, topic: &str, payload: Arc<[u8]>) -> BroadcastStats {
        let mut stats = BroadcastStats::default();
        let len = payload.len();

        #[allow(clippy::expect_used)]
        let topics = self.topics.lock().expect("bus mutex poisoned");
        let Some(subscribers) = topics.get(topic) else {
            return stats;
        };
        let targets: Vec<ConnectionId> = subscribers.iter().copied().collect();
        drop(topics);

        #[allow(clippy::expect_used)]
        let connections = self.connections.lock().expect("bus mutex poisoned");
        for connection in targets {
            let Some(entry) = connections.get(&connection) else {
                stats.skipped += 1;
                continue;
            };
            if entry.outstanding.load(Ordering::Relaxed) >= self.backpressure_bytes {
                debug!(%connection, topic, "skipping backpressured subscriber");
                stats.skipped += 1;
                continue;
            }
            if entry.sender.send(Frame::new(Arc::clone(&payload))).is_ok() {
                entry.outstanding.fetch_add(len, Ordering::Relaxed);
                stats.delivered += 1;
            } else {
                stats.skipped += 1;
            }
        }
        stats
    }

    /// Number of connections currently subscribed to `topic`.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        #[allow(clippy::expect_used)]
        let topics = self.topics.lock().expect("bus mutex poisoned");
        topics.get(topic).map_or(0, HashSet::len)
    }

    /// Deliver a payload to a single connection directly, bypassing topic
    /// fan-out. Used for a subscriber's own snapshot reply, which must reach
    /// only the requesting connection, never the rest of the topic.
    ///
    /// Returns `false` if the connection is unknown, closed, or
    /// backpressured; the caller has no further action to take in any case.
    pub fn send_to(&self, connection: ConnectionId, payload: Arc<[u8]>) -> bool {
        let len = payload.len();
        #[allow(clippy::expect_used)]
        let connections = self.connections.lock().expect("bus mutex poisoned");
        let Some(entry) = connections.get(&connection) else {
            return false;
        };
        if entry.outstanding.load(Ordering::Relaxed) >= self.backpressure_bytes {
            return false;
        }
        if entry.sender.send(Frame::new(payload)).is_ok() {
            entry.outstanding.fetch_add(len, Ordering::Relaxed);
            true
        } else {
            false
        }
    }
}
