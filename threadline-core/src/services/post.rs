use super::{ServiceError, require_text};
use crate::entities::parse_id;
use crate::entities::post::{
    DeletePostById, DeletePostsByAuthor, GetPostById, GetPostsByIds, InsertPost,
    ListPostsByAuthor, Post,
};
use crate::processors::PostLifecyclePublisher;
use crate::store::PostStore;
use kanau::processor::Processor;
use tracing::{info, warn};
use uuid::Uuid;

/// Result of deleting every post of an author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkPostDeletion {
    /// Posts captured right before the delete.
    pub posts: Vec<Post>,
    /// Count reported by the store for the delete itself.
    pub deleted_count: u64,
}

#[derive(Clone)]
pub struct PostService<S> {
    store: S,
    publisher: PostLifecyclePublisher,
}

impl<S: PostStore> PostService<S> {
    pub fn new(store: S, publisher: PostLifecyclePublisher) -> Self {
        Self { store, publisher }
    }

    pub async fn create_post(&self, author_id: &str, text: &str) -> Result<Post, ServiceError> {
        let text = require_text(text)?;
        let post = self
            .store
            .process(InsertPost {
                author_id: author_id.to_string(),
                text,
            })
            .await?;
        info!(post_id = %post.id, author_id, "Post created");
        self.publisher.on_post_created(&post).await;
        Ok(post)
    }

    pub async fn get_post(&self, id: &str) -> Result<Post, ServiceError> {
        let id = parse_id(id).ok_or(ServiceError::NotFound)?;
        self.store
            .process(GetPostById { id })
            .await?
            .ok_or(ServiceError::NotFound)
    }

    pub async fn get_posts_by_ids(&self, ids: Vec<Uuid>) -> Result<Vec<Post>, ServiceError> {
        Ok(self.store.process(GetPostsByIds { ids }).await?)
    }

    pub async fn list_posts_by_author(&self, author_id: &str) -> Result<Vec<Post>, ServiceError> {
        Ok(self
            .store
            .process(ListPostsByAuthor {
                author_id: author_id.to_string(),
            })
            .await?)
    }

    /// Delete one post and publish its `PostDeleted`.
    pub async fn delete_post(&self, id: &str, acting_user: &str) -> Result<Post, ServiceError> {
        let id = parse_id(id).ok_or(ServiceError::NotFound)?;
        let post = self
            .store
            .process(DeletePostById { id })
            .await?
            .ok_or(ServiceError::NotFound)?;
        info!(post_id = %post.id, acting_user, "Post deleted");
        self.publisher.on_post_deleted(&post, acting_user).await;
        Ok(post)
    }

    /// Delete every post of `author_id`, publishing one `PostDeleted` per post.
    ///
    /// The bulk delete only reports a count, so the posts are read first and
    /// only that captured set is deleted. A post created after the read
    /// survives; one deleted concurrently still gets an event.
    pub async fn delete_posts_by_author(
        &self,
        author_id: &str,
        acting_user: &str,
    ) -> Result<BulkPostDeletion, ServiceError> {
        let posts = self
            .store
            .process(ListPostsByAuthor {
                author_id: author_id.to_string(),
            })
            .await?;
        let deleted_count = self
            .store
            .process(DeletePostsByAuthor {
                author_id: author_id.to_string(),
                ids: posts.iter().map(|post| post.id).collect(),
            })
            .await?;

        if deleted_count != posts.len() as u64 {
            warn!(
                author_id,
                captured = posts.len(),
                deleted_count,
                "Posts changed between read and bulk delete"
            );
        }
        info!(author_id, acting_user, deleted_count, "Deleted posts of author");

        self.publisher.on_posts_deleted_bulk(&posts, acting_user).await;
        Ok(BulkPostDeletion {
            posts,
            deleted_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ChannelError, EventChannel, EventPublisher, LocalFanout, Subscription};
    use crate::store::{MemoryStore, StoreError};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Arc;
    use std::time::Duration;
    use threadline_sdk::objects::LifecycleEvent;

    /// Inserts one more post for the author right after every author listing.
    #[derive(Clone)]
    struct LateWriterStore {
        inner: MemoryStore,
    }

    impl Processor<ListPostsByAuthor> for LateWriterStore {
        type Output = Vec<Post>;
        type Error = StoreError;
        async fn process(&self, query: ListPostsByAuthor) -> Result<Vec<Post>, StoreError> {
            let author_id = query.author_id.clone();
            let posts = self.inner.process(query).await?;
            self.inner
                .process(InsertPost {
                    author_id,
                    text: "late".to_string(),
                })
                .await?;
            Ok(posts)
        }
    }

    macro_rules! delegate_to_inner {
        ($($query:ty => $output:ty),* $(,)?) => {$(
            impl Processor<$query> for LateWriterStore {
                type Output = $output;
                type Error = StoreError;
                async fn process(&self, query: $query) -> Result<$output, StoreError> {
                    self.inner.process(query).await
                }
            }
        )*};
    }

    delegate_to_inner! {
        InsertPost => Post,
        GetPostById => Option<Post>,
        GetPostsByIds => Vec<Post>,
        DeletePostById => Option<Post>,
        DeletePostsByAuthor => u64,
    }

    struct HangingChannel;

    #[async_trait]
    impl EventChannel for HangingChannel {
        async fn publish(&self, _topic: &str, _payload: Bytes) -> Result<usize, ChannelError> {
            std::future::pending().await
        }

        async fn subscribe(&self, _topic: &str) -> Result<Subscription, ChannelError> {
            std::future::pending().await
        }
    }

    fn service(store: &MemoryStore, fanout: &LocalFanout) -> PostService<MemoryStore> {
        let events = EventPublisher::new(Arc::new(fanout.clone()));
        PostService::new(store.clone(), PostLifecyclePublisher::new(events))
    }

    async fn next_event(subscription: &mut Subscription) -> LifecycleEvent {
        let payload = subscription.next().await.unwrap();
        LifecycleEvent::from_payload(&payload).unwrap()
    }

    #[tokio::test]
    async fn test_create_publishes_post_created() {
        let (store, fanout) = (MemoryStore::new(), LocalFanout::new());
        let mut events = fanout.subscribe("post_events").await.unwrap();
        let service = service(&store, &fanout);

        let post = service.create_post("u1", " hello ").await.unwrap();
        assert_eq!(post.text, "hello");
        assert_eq!(
            next_event(&mut events).await,
            LifecycleEvent::PostCreated {
                post_id: post.id,
                user_id: "u1".to_string(),
                created_at: post.created_at.unix_timestamp(),
            }
        );
    }

    #[tokio::test]
    async fn test_create_rejects_empty_text_before_store() {
        let (store, fanout) = (MemoryStore::new(), LocalFanout::new());
        let service = service(&store, &fanout);

        let result = service.create_post("u1", "   ").await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
        assert_eq!(store.operation_count().await, 0);
    }

    #[tokio::test]
    async fn test_delete_post_publishes_once() {
        let (store, fanout) = (MemoryStore::new(), LocalFanout::new());
        let service = service(&store, &fanout);
        let post = service.create_post("u1", "hello").await.unwrap();

        let mut events = fanout.subscribe("post_events").await.unwrap();
        let deleted = service.delete_post(&post.id.to_string(), "u9").await.unwrap();
        assert_eq!(deleted, post);
        match next_event(&mut events).await {
            LifecycleEvent::PostDeleted {
                post_id, user_id, ..
            } => {
                assert_eq!(post_id, post.id);
                assert_eq!(user_id, "u9");
            }
            other => panic!("unexpected event {other:?}"),
        }

        let again = service.delete_post(&post.id.to_string(), "u9").await;
        assert!(matches!(again, Err(ServiceError::NotFound)));
        let malformed = service.delete_post("42", "u9").await;
        assert!(matches!(malformed, Err(ServiceError::NotFound)));
    }

    #[tokio::test]
    async fn test_bulk_delete_returns_pre_deletion_set() {
        let (store, fanout) = (MemoryStore::new(), LocalFanout::new());
        let service = service(&store, &fanout);
        let mut created = Vec::new();
        for text in ["one", "two", "three"] {
            created.push(service.create_post("u1", text).await.unwrap());
        }
        let other = service.create_post("u2", "keep").await.unwrap();

        let mut events = fanout.subscribe("post_events").await.unwrap();
        let result = service.delete_posts_by_author("u1", "u1").await.unwrap();
        assert_eq!(result.posts, created);
        assert_eq!(result.deleted_count, 3);
        assert_eq!(store.post_ids().await, vec![other.id]);

        let mut published = Vec::new();
        for _ in 0..3 {
            match next_event(&mut events).await {
                LifecycleEvent::PostDeleted { post_id, .. } => published.push(post_id),
                other => panic!("unexpected event {other:?}"),
            }
        }
        let expected: Vec<Uuid> = created.iter().map(|p| p.id).collect();
        assert_eq!(published, expected);
    }

    #[tokio::test]
    async fn test_bulk_delete_spares_posts_created_after_read() {
        let (store, fanout) = (MemoryStore::new(), LocalFanout::new());
        let seeding = service(&store, &fanout);
        for text in ["one", "two", "three"] {
            seeding.create_post("u1", text).await.unwrap();
        }

        let events = EventPublisher::new(Arc::new(fanout.clone()));
        let racing = PostService::new(
            LateWriterStore {
                inner: store.clone(),
            },
            PostLifecyclePublisher::new(events),
        );
        let mut subscription = fanout.subscribe("post_events").await.unwrap();
        let result = racing.delete_posts_by_author("u1", "u1").await.unwrap();

        assert_eq!(result.posts.len(), 3);
        assert_eq!(result.deleted_count, 3);
        let remaining = store.post_ids().await;
        assert_eq!(remaining.len(), 1);
        assert!(result.posts.iter().all(|post| !remaining.contains(&post.id)));

        for post in &result.posts {
            match next_event(&mut subscription).await {
                LifecycleEvent::PostDeleted { post_id, .. } => assert_eq!(post_id, post.id),
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_returns_when_channel_hangs() {
        let store = MemoryStore::new();
        let events =
            EventPublisher::new(Arc::new(HangingChannel)).with_timeout(Duration::from_secs(2));
        let service = PostService::new(store.clone(), PostLifecyclePublisher::new(events));
        let post = service.create_post("u1", "hello").await.unwrap();

        let deleted = tokio::time::timeout(
            Duration::from_secs(600),
            service.delete_post(&post.id.to_string(), "u1"),
        )
        .await
        .expect("delete_post must not wait on the channel")
        .unwrap();
        assert_eq!(deleted.id, post.id);
        assert!(store.post_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_bulk_delete_with_no_posts() {
        let (store, fanout) = (MemoryStore::new(), LocalFanout::new());
        let service = service(&store, &fanout);

        let result = service.delete_posts_by_author("nobody", "u1").await.unwrap();
        assert!(result.posts.is_empty());
        assert_eq!(result.deleted_count, 0);
    }

    #[tokio::test]
    async fn test_store_failure_surfaces() {
        let (store, fanout) = (MemoryStore::new(), LocalFanout::new());
        let service = service(&store, &fanout);
        store.fail_after(0).await;

        let result = service.list_posts_by_author("u1").await;
        assert!(matches!(
            result,
            Err(ServiceError::Store(StoreError::Unavailable(_)))
        ));
    }

    #[tokio::test]
    async fn test_reads() {
        let (store, fanout) = (MemoryStore::new(), LocalFanout::new());
        let service = service(&store, &fanout);
        let first = service.create_post("u1", "first").await.unwrap();
        let second = service.create_post("u2", "second").await.unwrap();

        assert_eq!(service.get_post(&first.id.to_string()).await.unwrap(), first);
        assert!(matches!(
            service.get_post("nope").await,
            Err(ServiceError::NotFound)
        ));
        let many = service
            .get_posts_by_ids(vec![second.id, Uuid::now_v7()])
            .await
            .unwrap();
        assert_eq!(many, vec![second]);
        assert_eq!(service.list_posts_by_author("u1").await.unwrap(), vec![first]);
    }
}
