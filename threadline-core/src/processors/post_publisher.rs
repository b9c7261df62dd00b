//! PostLifecyclePublisher.
//!
//! Turns committed post mutations into lifecycle events on `post_events`.
//! Every deleted post gets its own `PostDeleted`, including posts removed by
//! a bulk delete, so subscribers never need to know about bulk operations.

use crate::entities::post::Post;
use crate::events::EventPublisher;
use threadline_sdk::objects::LifecycleEvent;
use tracing::info;

#[derive(Clone)]
pub struct PostLifecyclePublisher {
    events: EventPublisher,
}

impl PostLifecyclePublisher {
    pub fn new(events: EventPublisher) -> Self {
        Self { events }
    }

    pub async fn on_post_created(&self, post: &Post) {
        let event = LifecycleEvent::PostCreated {
            post_id: post.id,
            user_id: post.author_id.clone(),
            created_at: post.created_at.unix_timestamp(),
        };
        self.events.emit(&event).await;
    }

    /// Publish one `PostDeleted` for a post the store has confirmed deleted.
    pub async fn on_post_deleted(&self, post: &Post, acting_user: &str) {
        let event = deleted_event(post, acting_user, now());
        self.events.emit(&event).await;
    }

    /// Publish one independent `PostDeleted` per post. Returns how many
    /// events were handed to the channel.
    pub async fn on_posts_deleted_bulk(&self, posts: &[Post], acting_user: &str) -> usize {
        let deleted_at = now();
        let mut published = 0;
        for post in posts {
            let event = deleted_event(post, acting_user, deleted_at);
            if self.events.emit(&event).await.is_some() {
                published += 1;
            }
        }
        info!(
            user_id = acting_user,
            posts = posts.len(),
            published,
            "Published bulk post deletion"
        );
        published
    }
}

fn now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

fn deleted_event(post: &Post, acting_user: &str, deleted_at: i64) -> LifecycleEvent {
    LifecycleEvent::PostDeleted {
        post_id: post.id,
        user_id: acting_user.to_string(),
        deleted_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventChannel, LocalFanout};
    use std::collections::HashSet;
    use std::sync::Arc;
    use uuid::Uuid;

    fn post(author: &str) -> Post {
        Post {
            id: Uuid::now_v7(),
            author_id: author.to_string(),
            text: "hello".to_string(),
            created_at: time::OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn test_bulk_publishes_one_event_per_post() {
        let fanout = LocalFanout::new();
        let mut subscription = fanout.subscribe("post_events").await.unwrap();
        let publisher = PostLifecyclePublisher::new(EventPublisher::new(Arc::new(fanout)));

        let posts = vec![post("u1"), post("u1"), post("u1")];
        let published = publisher.on_posts_deleted_bulk(&posts, "admin").await;
        assert_eq!(published, 3);

        let mut seen = HashSet::new();
        for _ in 0..3 {
            let payload = subscription.next().await.unwrap();
            match LifecycleEvent::from_payload(&payload).unwrap() {
                LifecycleEvent::PostDeleted {
                    post_id, user_id, ..
                } => {
                    assert_eq!(user_id, "admin");
                    seen.insert(post_id);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        let expected: HashSet<Uuid> = posts.iter().map(|p| p.id).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn test_publish_without_subscriber_is_harmless() {
        let publisher =
            PostLifecyclePublisher::new(EventPublisher::new(Arc::new(LocalFanout::new())));
        publisher.on_post_deleted(&post("u1"), "u1").await;
        assert_eq!(publisher.on_posts_deleted_bulk(&[post("u1")], "u1").await, 1);
    }
}
