//! Redis pub/sub backend for [`EventChannel`].
//!
//! Redis fanout has the same at-most-once semantics as the in-process
//! channel: `PUBLISH` reaches the subscribers connected at that moment and
//! nothing else. Publishing shares one lazily created connection manager.
//! Each subscription owns a dedicated pub/sub connection.

use super::channels::{ChannelError, EventChannel, Subscription};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::{OnceCell, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

const SUBSCRIPTION_BUFFER: usize = 256;

pub struct RedisFanout {
    client: redis::Client,
    publisher: OnceCell<ConnectionManager>,
}

impl RedisFanout {
    /// Validate the URL. No connection is made until the first publish or
    /// subscribe.
    pub fn open(url: &str) -> Result<Self, ChannelError> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            publisher: OnceCell::new(),
        })
    }

    async fn publisher(&self) -> Result<ConnectionManager, ChannelError> {
        let manager = self
            .publisher
            .get_or_try_init(|| async {
                info!("Opening redis publish connection");
                ConnectionManager::new(self.client.clone()).await
            })
            .await?;
        Ok(manager.clone())
    }
}

#[async_trait]
impl EventChannel for RedisFanout {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<usize, ChannelError> {
        let mut conn = self.publisher().await?;
        let receivers: usize = conn.publish(topic, payload.to_vec()).await?;
        debug!(%topic, receivers, "Published to redis");
        Ok(receivers)
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, ChannelError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(topic).await?;
        info!(%topic, "Subscribed to redis channel");

        let (tx, rx) = mpsc::channel::<Bytes>(SUBSCRIPTION_BUFFER);
        let name = topic.to_string();
        tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            loop {
                tokio::select! {
                    biased;

                    _ = tx.closed() => {
                        debug!(topic = %name, "Subscription dropped, closing pub/sub connection");
                        break;
                    }

                    msg = stream.next() => {
                        let Some(msg) = msg else {
                            warn!(topic = %name, "Redis pub/sub connection closed");
                            break;
                        };
                        let payload = Bytes::copy_from_slice(msg.get_payload_bytes());
                        if tx.try_send(payload).is_err() {
                            warn!(topic = %name, "Subscriber is not keeping up, message dropped");
                        }
                    }
                }
            }
        });

        Ok(Subscription::new(topic, ReceiverStream::new(rx).boxed()))
    }
}
