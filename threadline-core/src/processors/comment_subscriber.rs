//! CommentLifecycleSubscriber processor.
//!
//! The CommentLifecycleSubscriber is responsible for:
//! - Binding to `post_events` when the comment service starts
//! - Purging every comment of a post when its `PostDeleted` arrives
//! - Discarding payloads it cannot decode and events it does not act on
//! - Rebinding with exponential backoff when the subscription is lost
//!
//! The purge is a single filter delete on `post_id`. It does not walk
//! comment threads and publishes no events. Delivery is at-most-once, so a
//! post deleted while the subscriber is unbound leaves its comments behind;
//! `DELETE /comments/by-post/{post_id}` exists to clean those up.

use crate::entities::comment::DeleteCommentsByPost;
use crate::events::{EventChannel, InboundMessage, Subscription};
use crate::store::{CommentStore, StoreError};
use crate::utils::backoff::ReconnectBackoff;
use kanau::processor::Processor;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use threadline_sdk::objects::{EventParseError, LifecycleEvent, Topic};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberState {
    /// Not subscribed. Events published now are lost to this service.
    Unbound,
    /// Subscribed, nothing received yet on this binding.
    Bound,
    /// Subscribed and handling traffic.
    Consuming,
}

/// What the subscriber did with one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Purged { post_id: Uuid, deleted_count: u64 },
    Ignored { kind: &'static str },
}

#[derive(Debug, Error)]
pub enum SubscriberError {
    #[error("malformed event: {0}")]
    Malformed(#[from] EventParseError),
    #[error("purge failed: {0}")]
    Store(#[from] StoreError),
}

pub struct CommentLifecycleSubscriber<S> {
    store: S,
    channel: Arc<dyn EventChannel>,
    backoff: ReconnectBackoff,
    state_tx: watch::Sender<SubscriberState>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<S: CommentStore> CommentLifecycleSubscriber<S> {
    /// Create a new CommentLifecycleSubscriber.
    ///
    /// # Arguments
    ///
    /// * `store` - Comment store the purge runs against
    /// * `channel` - Event channel carrying `post_events`
    /// * `backoff` - Delay policy between bind attempts
    /// * `shutdown_rx` - Receiver for shutdown signal
    pub fn new(
        store: S,
        channel: Arc<dyn EventChannel>,
        backoff: ReconnectBackoff,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SubscriberState::Unbound);
        Self {
            store,
            channel,
            backoff,
            state_tx,
            shutdown_rx,
        }
    }

    /// Watch the binding state.
    pub fn state(&self) -> watch::Receiver<SubscriberState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: SubscriberState) {
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    /// Run the subscriber until shutdown.
    pub async fn run(self) {
        let topic = Topic::PostEvents.as_str();
        let mut shutdown_rx = self.shutdown_rx.clone();
        let mut attempt: u32 = 0;
        info!(%topic, "CommentLifecycleSubscriber started");

        loop {
            self.set_state(SubscriberState::Unbound);

            let bound = tokio::select! {
                biased;

                _ = wait_for_shutdown(&mut shutdown_rx) => break,

                result = self.channel.subscribe(topic) => result,
            };

            let subscription = match bound {
                Ok(subscription) => subscription,
                Err(e) => {
                    let delay = self.backoff.delay(attempt);
                    attempt = attempt.saturating_add(1);
                    warn!(
                        %topic,
                        error = %e,
                        attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        "Failed to subscribe, retrying"
                    );
                    if pause(delay, &mut shutdown_rx).await {
                        continue;
                    }
                    break;
                }
            };

            attempt = 0;
            self.set_state(SubscriberState::Bound);
            info!(%topic, "Bound to topic");

            if !self.consume(subscription, &mut shutdown_rx).await {
                break;
            }

            let delay = self.backoff.delay(attempt);
            attempt = attempt.saturating_add(1);
            warn!(
                %topic,
                retry_in_ms = delay.as_millis() as u64,
                "Subscription lost, rebinding"
            );
            self.set_state(SubscriberState::Unbound);
            if !pause(delay, &mut shutdown_rx).await {
                break;
            }
        }

        self.set_state(SubscriberState::Unbound);
        info!("CommentLifecycleSubscriber shutdown complete");
    }

    /// Handle messages until the subscription ends (`true`) or shutdown is
    /// requested (`false`).
    async fn consume(
        &self,
        mut subscription: Subscription,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> bool {
        loop {
            let payload = tokio::select! {
                biased;

                _ = wait_for_shutdown(shutdown_rx) => {
                    info!("CommentLifecycleSubscriber received shutdown signal");
                    return false;
                }

                payload = subscription.next() => payload,
            };

            let Some(payload) = payload else {
                return true;
            };

            self.set_state(SubscriberState::Consuming);
            let message = InboundMessage::new(subscription.topic(), payload);
            match self.process(message.clone()).await {
                Ok(Disposition::Purged {
                    post_id,
                    deleted_count,
                }) => {
                    info!(%post_id, deleted_count, "Purged comments of deleted post");
                }
                Ok(Disposition::Ignored { kind }) => {
                    debug!(kind, "Ignoring post event");
                }
                Err(SubscriberError::Malformed(e)) => {
                    warn!(
                        error = %e,
                        payload = %message.payload_lossy(),
                        "Discarding malformed post event"
                    );
                }
                Err(e) => {
                    warn!(error = %e, "Failed to handle post event");
                }
            }
        }
    }
}

impl<S: CommentStore> Processor<InboundMessage> for CommentLifecycleSubscriber<S> {
    type Output = Disposition;
    type Error = SubscriberError;

    async fn process(&self, message: InboundMessage) -> Result<Disposition, SubscriberError> {
        let event = LifecycleEvent::from_payload(&message.payload)?;
        match event {
            LifecycleEvent::PostDeleted { post_id, .. } => {
                let deleted_count = self.store.process(DeleteCommentsByPost { post_id }).await?;
                Ok(Disposition::Purged {
                    post_id,
                    deleted_count,
                })
            }
            other => Ok(Disposition::Ignored { kind: other.kind() }),
        }
    }
}

/// Resolves once shutdown is requested or the sender is gone.
async fn wait_for_shutdown(shutdown_rx: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown_rx.borrow_and_update() {
            return;
        }
        if shutdown_rx.changed().await.is_err() {
            return;
        }
    }
}

/// Sleep for `delay`. Returns `false` if shutdown arrived first.
async fn pause(delay: Duration, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        biased;

        _ = wait_for_shutdown(shutdown_rx) => false,

        _ = tokio::time::sleep(delay) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::comment::{Comment, InsertComment};
    use crate::events::{ChannelError, EventPublisher, LocalFanout};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures_util::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn subscriber(
        store: MemoryStore,
        channel: Arc<dyn EventChannel>,
    ) -> (CommentLifecycleSubscriber<MemoryStore>, watch::Sender<bool>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let backoff = ReconnectBackoff::new(Duration::from_secs(1), Duration::from_secs(8));
        (
            CommentLifecycleSubscriber::new(store, channel, backoff, shutdown_rx),
            shutdown_tx,
        )
    }

    async fn comment(store: &MemoryStore, post_id: Uuid) -> Comment {
        store
            .process(InsertComment {
                post_id,
                parent_id: post_id,
                author_id: "u1".to_string(),
                text: "hi".to_string(),
            })
            .await
            .unwrap()
    }

    fn post_deleted(post_id: Uuid) -> LifecycleEvent {
        LifecycleEvent::PostDeleted {
            post_id,
            user_id: "u1".to_string(),
            deleted_at: 1,
        }
    }

    fn message(event: &LifecycleEvent) -> InboundMessage {
        InboundMessage::new("post_events", Bytes::from(event.to_payload().unwrap()))
    }

    #[tokio::test]
    async fn test_post_deleted_purges_only_that_post() {
        let store = MemoryStore::new();
        let (p1, p2) = (Uuid::now_v7(), Uuid::now_v7());
        let a = comment(&store, p1).await;
        comment(&store, p1).await;
        let keep = comment(&store, p2).await;
        // a reply inside the purged post goes too, no tree walk needed
        store
            .process(InsertComment {
                post_id: p1,
                parent_id: a.id,
                author_id: "u2".to_string(),
                text: "reply".to_string(),
            })
            .await
            .unwrap();

        let (subscriber, _shutdown) = subscriber(store.clone(), Arc::new(LocalFanout::new()));
        let disposition = subscriber.process(message(&post_deleted(p1))).await.unwrap();
        assert_eq!(
            disposition,
            Disposition::Purged {
                post_id: p1,
                deleted_count: 3
            }
        );
        assert_eq!(store.comment_ids().await, vec![keep.id]);
    }

    #[tokio::test]
    async fn test_duplicate_post_deleted_is_noop() {
        let store = MemoryStore::new();
        let p1 = Uuid::now_v7();
        comment(&store, p1).await;

        let (subscriber, _shutdown) = subscriber(store.clone(), Arc::new(LocalFanout::new()));
        let event = post_deleted(p1);
        subscriber.process(message(&event)).await.unwrap();
        let again = subscriber.process(message(&event)).await.unwrap();
        assert_eq!(
            again,
            Disposition::Purged {
                post_id: p1,
                deleted_count: 0
            }
        );
    }

    #[tokio::test]
    async fn test_other_kinds_and_garbage_are_not_purges() {
        let store = MemoryStore::new();
        let (subscriber, _shutdown) = subscriber(store.clone(), Arc::new(LocalFanout::new()));

        let created = LifecycleEvent::PostCreated {
            post_id: Uuid::now_v7(),
            user_id: "u1".to_string(),
            created_at: 1,
        };
        assert_eq!(
            subscriber.process(message(&created)).await.unwrap(),
            Disposition::Ignored {
                kind: "PostCreated"
            }
        );

        let garbage = InboundMessage::new("post_events", Bytes::from_static(b"{\"event\":1}"));
        assert!(matches!(
            subscriber.process(garbage).await,
            Err(SubscriberError::Malformed(_))
        ));
        assert_eq!(store.operation_count().await, 0);
    }

    #[tokio::test]
    async fn test_loop_survives_malformed_payload() {
        let store = MemoryStore::new();
        let p1 = Uuid::now_v7();
        comment(&store, p1).await;

        let fanout = LocalFanout::new();
        let mut comment_events = fanout.subscribe("comment_events").await.unwrap();
        let (subscriber, shutdown_tx) = subscriber(store.clone(), Arc::new(fanout.clone()));
        let mut state = subscriber.state();
        let handle = tokio::spawn(subscriber.run());
        state
            .wait_for(|s| *s == SubscriberState::Bound)
            .await
            .unwrap();

        fanout
            .publish("post_events", Bytes::from_static(b"not json"))
            .await
            .unwrap();
        let publisher = EventPublisher::new(Arc::new(fanout.clone()));
        assert_eq!(publisher.emit(&post_deleted(p1)).await, Some(1));

        for _ in 0..200 {
            if store.comment_ids().await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(store.comment_ids().await.is_empty());
        assert_eq!(*state.borrow(), SubscriberState::Consuming);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
        assert_eq!(*state.borrow(), SubscriberState::Unbound);

        // a purge is silent on comment_events, so the marker comes first
        fanout
            .publish("comment_events", Bytes::from_static(b"marker"))
            .await
            .unwrap();
        assert_eq!(
            comment_events.next().await,
            Some(Bytes::from_static(b"marker"))
        );
    }

    /// Fails the first `failures` subscribe calls, hands out one subscription
    /// that ends immediately, then delegates to a real fanout.
    struct FlakyChannel {
        inner: LocalFanout,
        failures: usize,
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl EventChannel for FlakyChannel {
        async fn publish(&self, topic: &str, payload: Bytes) -> Result<usize, ChannelError> {
            self.inner.publish(topic, payload).await
        }

        async fn subscribe(&self, topic: &str) -> Result<Subscription, ChannelError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.failures {
                Err(ChannelError::Unavailable("broker down".to_string()))
            } else if attempt == self.failures {
                Ok(Subscription::new(topic, futures_util::stream::empty().boxed()))
            } else {
                self.inner.subscribe(topic).await
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rebinds_after_failures_and_lost_stream() {
        let channel = Arc::new(FlakyChannel {
            inner: LocalFanout::new(),
            failures: 2,
            attempts: AtomicUsize::new(0),
        });
        let (subscriber, shutdown_tx) = subscriber(MemoryStore::new(), channel.clone());
        let mut state = subscriber.state();
        let handle = tokio::spawn(subscriber.run());

        // two failed binds, one lost stream, then a lasting binding
        loop {
            state.changed().await.unwrap();
            if *state.borrow() == SubscriberState::Bound
                && channel.attempts.load(Ordering::SeqCst) == 4
            {
                break;
            }
        }
        assert_eq!(channel.inner.subscriber_count("post_events").await, 1);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
        assert_eq!(channel.inner.subscriber_count("post_events").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_while_backing_off() {
        let channel = Arc::new(FlakyChannel {
            inner: LocalFanout::new(),
            failures: usize::MAX,
            attempts: AtomicUsize::new(0),
        });
        let (subscriber, shutdown_tx) = subscriber(MemoryStore::new(), channel.clone());
        let handle = tokio::spawn(subscriber.run());

        tokio::time::sleep(Duration::from_secs(5)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
        assert!(channel.attempts.load(Ordering::SeqCst) >= 2);
    }
}
