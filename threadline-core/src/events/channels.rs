//! Fanout event channels.
//!
//! A channel delivers every message published on a topic to every
//! subscription currently bound to that topic. Delivery is at-most-once:
//! nothing is stored for subscribers that are not bound, and slow
//! subscribers may lose messages.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, warn};

/// Default per-topic buffer of the in-process channel.
pub const DEFAULT_FANOUT_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("event channel unavailable: {0}")]
    Unavailable(String),
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// A broadcast transport keyed by topic name.
#[async_trait]
pub trait EventChannel: Send + Sync {
    /// Publish a payload to every current subscriber of `topic`.
    ///
    /// Returns the number of subscribers the channel handed the payload to,
    /// when the backend reports it. Zero subscribers is not an error.
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<usize, ChannelError>;

    /// Bind a new subscription to `topic`. Only messages published after the
    /// bind completes are delivered.
    async fn subscribe(&self, topic: &str) -> Result<Subscription, ChannelError>;
}

/// A bound subscription. The stream ends when the underlying connection is
/// lost; the owner is expected to subscribe again.
pub struct Subscription {
    topic: String,
    messages: BoxStream<'static, Bytes>,
}

impl Subscription {
    pub fn new(topic: impl Into<String>, messages: BoxStream<'static, Bytes>) -> Self {
        Self {
            topic: topic.into(),
            messages,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for the next message, or `None` once the subscription is gone.
    pub async fn next(&mut self) -> Option<Bytes> {
        self.messages.next().await
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

/// In-process fanout built on `tokio::sync::broadcast`, one sender per topic.
#[derive(Clone)]
pub struct LocalFanout {
    topics: Arc<RwLock<HashMap<String, broadcast::Sender<Bytes>>>>,
    capacity: usize,
}

impl LocalFanout {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_FANOUT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Number of subscriptions currently bound to `topic`.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .await
            .get(topic)
            .map(broadcast::Sender::receiver_count)
            .unwrap_or(0)
    }
}

impl Default for LocalFanout {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventChannel for LocalFanout {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<usize, ChannelError> {
        let topics = self.topics.read().await;
        let Some(sender) = topics.get(topic) else {
            debug!(%topic, "Publish with no subscriber ever bound, dropping");
            return Ok(0);
        };
        // Err means no receivers
        Ok(sender.send(payload).unwrap_or(0))
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, ChannelError> {
        let receiver = {
            let mut topics = self.topics.write().await;
            topics
                .entry(topic.to_string())
                .or_insert_with(|| broadcast::channel(self.capacity).0)
                .subscribe()
        };

        let name = topic.to_string();
        let messages = BroadcastStream::new(receiver).filter_map(move |item| {
            let name = name.clone();
            async move {
                match item {
                    Ok(payload) => Some(payload),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        warn!(topic = %name, skipped, "Subscriber lagged, messages dropped");
                        None
                    }
                }
            }
        });

        Ok(Subscription::new(topic, messages.boxed()))
    }
}
