use super::{ServiceError, require_text};
use crate::entities::comment::{
    Comment, DeleteCommentsByPost, GetCommentById, InsertComment, ListCommentsByParent,
    ListCommentsByPostAndParent, UpdateCommentText,
};
use crate::entities::parse_id;
use crate::events::EventPublisher;
use crate::processors::delete_tree;
use crate::store::CommentStore;
use kanau::processor::Processor;
use threadline_sdk::objects::LifecycleEvent;
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct CommentService<S> {
    store: S,
    events: EventPublisher,
}

impl<S: CommentStore> CommentService<S> {
    pub fn new(store: S, events: EventPublisher) -> Self {
        Self { store, events }
    }

    /// Create a comment on `post_id`, replying to `parent_id` when given.
    ///
    /// Without a parent, or with the post id as parent, the comment is top
    /// level. Any other parent must be an existing comment of the same post.
    pub async fn create_comment(
        &self,
        author_id: &str,
        post_id: &str,
        parent_id: Option<&str>,
        text: &str,
    ) -> Result<Comment, ServiceError> {
        let text = require_text(text)?;
        let post_id = parse_id(post_id)
            .ok_or_else(|| ServiceError::Validation("malformed post id".to_string()))?;
        let parent_id = match parent_id.map(str::trim).filter(|raw| !raw.is_empty()) {
            None => post_id,
            Some(raw) => parse_id(raw)
                .ok_or_else(|| ServiceError::Validation("malformed parent id".to_string()))?,
        };

        if parent_id != post_id {
            let parent = self.store.process(GetCommentById { id: parent_id }).await?;
            if !parent.is_some_and(|parent| parent.post_id == post_id) {
                return Err(ServiceError::Validation(
                    "parent comment does not exist on this post".to_string(),
                ));
            }
        }

        let comment = self
            .store
            .process(InsertComment {
                post_id,
                parent_id,
                author_id: author_id.to_string(),
                text,
            })
            .await?;
        info!(comment_id = %comment.id, post_id = %comment.post_id, author_id, "Comment created");

        self.events
            .emit(&LifecycleEvent::CommentCreated {
                comment_id: comment.id,
                post_id: comment.post_id,
                parent_id: comment.parent_id,
                user_id: comment.author_id.clone(),
                created_at: comment.created_at.unix_timestamp(),
            })
            .await;
        Ok(comment)
    }

    /// Direct children of a post or comment.
    pub async fn list_by_parent(&self, parent_id: &str) -> Result<Vec<Comment>, ServiceError> {
        let Some(parent_id) = parse_id(parent_id) else {
            return Ok(Vec::new());
        };
        Ok(self.store.process(ListCommentsByParent { parent_id }).await?)
    }

    pub async fn list_by_post_and_parent(
        &self,
        post_id: &str,
        parent_id: &str,
    ) -> Result<Vec<Comment>, ServiceError> {
        let (Some(post_id), Some(parent_id)) = (parse_id(post_id), parse_id(parent_id)) else {
            return Ok(Vec::new());
        };
        Ok(self
            .store
            .process(ListCommentsByPostAndParent { post_id, parent_id })
            .await?)
    }

    pub async fn update_comment(&self, id: &str, text: &str) -> Result<Comment, ServiceError> {
        let text = require_text(text)?;
        let id = parse_id(id).ok_or(ServiceError::NotFound)?;
        self.store
            .process(UpdateCommentText { id, text })
            .await?
            .ok_or(ServiceError::NotFound)
    }

    /// Delete a comment and its whole thread, publishing one
    /// `CommentDeleted` per removed comment.
    ///
    /// If the store fails midway the error is returned and nothing is
    /// published, although part of the thread may already be gone.
    pub async fn delete_comment(&self, id: &str) -> Result<Vec<Comment>, ServiceError> {
        let deleted = delete_tree(&self.store, id).await?;
        if deleted.is_empty() {
            return Err(ServiceError::NotFound);
        }

        let deleted_at = time::OffsetDateTime::now_utc().unix_timestamp();
        for comment in &deleted {
            self.events
                .emit(&LifecycleEvent::CommentDeleted {
                    comment_id: comment.id,
                    deleted_at,
                })
                .await;
        }
        Ok(deleted)
    }

    /// Remove every comment of a post with one filter delete. Publishes
    /// nothing, same as the purge driven by `PostDeleted`.
    pub async fn purge_post_comments(&self, post_id: &str) -> Result<(Uuid, u64), ServiceError> {
        let post_id = parse_id(post_id).ok_or(ServiceError::NotFound)?;
        let deleted_count = self.store.process(DeleteCommentsByPost { post_id }).await?;
        if deleted_count == 0 {
            return Err(ServiceError::NotFound);
        }
        info!(%post_id, deleted_count, "Purged comments of post");
        Ok((post_id, deleted_count))
    }
}
