use super::channels::EventChannel;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use threadline_sdk::objects::LifecycleEvent;
use tracing::{debug, error};

pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(2);

/// Serializes lifecycle events onto their topic.
///
/// Publishing is best effort. A failure or a publish that outlives the
/// timeout is logged and reported as `None` but never fails the operation
/// that produced the event, since the data change it describes has already
/// been committed.
#[derive(Clone)]
pub struct EventPublisher {
    channel: Arc<dyn EventChannel>,
    timeout: Duration,
}

impl EventPublisher {
    pub fn new(channel: Arc<dyn EventChannel>) -> Self {
        Self {
            channel,
            timeout: DEFAULT_PUBLISH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Publish `event`, returning how many subscribers received it.
    pub async fn emit(&self, event: &LifecycleEvent) -> Option<usize> {
        let topic = event.topic();
        let payload = match event.to_payload() {
            Ok(payload) => Bytes::from(payload),
            Err(e) => {
                error!(kind = event.kind(), error = %e, "Failed to encode event");
                return None;
            }
        };

        let publish = self.channel.publish(topic.as_str(), payload);
        match tokio::time::timeout(self.timeout, publish).await {
            Ok(Ok(receivers)) => {
                debug!(%topic, kind = event.kind(), receivers, "Event published");
                Some(receivers)
            }
            Ok(Err(e)) => {
                error!(%topic, kind = event.kind(), error = %e, "Failed to publish event");
                None
            }
            Err(_) => {
                error!(
                    %topic,
                    kind = event.kind(),
                    timeout = ?self.timeout,
                    "Publishing event timed out"
                );
                None
            }
        }
    }
}
