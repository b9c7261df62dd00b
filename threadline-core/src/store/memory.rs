//! In-process store used by tests and local runs without Postgres.
//!
//! Records are kept in insertion order, which stands in for the
//! `ORDER BY created_at, id` of the SQL queries. Failures can be injected
//! with [`MemoryStore::fail_after`] to exercise partial deletions.

use super::StoreError;
use crate::entities::comment::{
    Comment, DeleteCommentById, DeleteCommentsByPost, GetCommentById, InsertComment,
    ListCommentsByParent, ListCommentsByPostAndParent, UpdateCommentText,
};
use crate::entities::post::{
    DeletePostById, DeletePostsByAuthor, GetPostById, GetPostsByIds, InsertPost,
    ListPostsByAuthor, Post,
};
use kanau::processor::Processor;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    posts: Vec<Post>,
    comments: Vec<Comment>,
    operations: u64,
    /// Operation number from which every call fails.
    fail_from: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `successes` more operations through, then fail every call until
    /// [`heal`](Self::heal) is called.
    pub async fn fail_after(&self, successes: u64) {
        let mut tables = self.tables.lock().await;
        tables.fail_from = Some(tables.operations + successes);
    }

    pub async fn heal(&self) {
        self.tables.lock().await.fail_from = None;
    }

    /// Number of operations attempted so far, failed ones included.
    pub async fn operation_count(&self) -> u64 {
        self.tables.lock().await.operations
    }

    pub async fn comment_ids(&self) -> Vec<Uuid> {
        let tables = self.tables.lock().await;
        tables.comments.iter().map(|comment| comment.id).collect()
    }

    pub async fn post_ids(&self) -> Vec<Uuid> {
        let tables = self.tables.lock().await;
        tables.posts.iter().map(|post| post.id).collect()
    }

    async fn begin(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        let mut tables = self.tables.lock().await;
        let current = tables.operations;
        tables.operations += 1;
        match tables.fail_from {
            Some(fail_from) if current >= fail_from => Err(StoreError::Unavailable(format!(
                "injected failure at operation {current}"
            ))),
            _ => Ok(tables),
        }
    }
}

fn now() -> time::OffsetDateTime {
    time::OffsetDateTime::now_utc()
}

impl Processor<InsertComment> for MemoryStore {
    type Output = Comment;
    type Error = StoreError;
    async fn process(&self, insert: InsertComment) -> Result<Comment, StoreError> {
        let mut tables = self.begin().await?;
        let created_at = now();
        let comment = Comment {
            id: Uuid::now_v7(),
            post_id: insert.post_id,
            parent_id: insert.parent_id,
            author_id: insert.author_id,
            text: insert.text,
            created_at,
            updated_at: created_at,
        };
        tables.comments.push(comment.clone());
        Ok(comment)
    }
}

impl Processor<GetCommentById> for MemoryStore {
    type Output = Option<Comment>;
    type Error = StoreError;
    async fn process(&self, query: GetCommentById) -> Result<Option<Comment>, StoreError> {
        let tables = self.begin().await?;
        Ok(tables.comments.iter().find(|c| c.id == query.id).cloned())
    }
}

impl Processor<ListCommentsByParent> for MemoryStore {
    type Output = Vec<Comment>;
    type Error = StoreError;
    async fn process(&self, query: ListCommentsByParent) -> Result<Vec<Comment>, StoreError> {
        let tables = self.begin().await?;
        Ok(tables
            .comments
            .iter()
            .filter(|c| c.parent_id == query.parent_id)
            .cloned()
            .collect())
    }
}

impl Processor<ListCommentsByPostAndParent> for MemoryStore {
    type Output = Vec<Comment>;
    type Error = StoreError;
    async fn process(
        &self,
        query: ListCommentsByPostAndParent,
    ) -> Result<Vec<Comment>, StoreError> {
        let tables = self.begin().await?;
        Ok(tables
            .comments
            .iter()
            .filter(|c| c.post_id == query.post_id && c.parent_id == query.parent_id)
            .cloned()
            .collect())
    }
}

impl Processor<UpdateCommentText> for MemoryStore {
    type Output = Option<Comment>;
    type Error = StoreError;
    async fn process(&self, update: UpdateCommentText) -> Result<Option<Comment>, StoreError> {
        let mut tables = self.begin().await?;
        let Some(comment) = tables.comments.iter_mut().find(|c| c.id == update.id) else {
            return Ok(None);
        };
        comment.text = update.text;
        comment.updated_at = now();
        Ok(Some(comment.clone()))
    }
}

impl Processor<DeleteCommentById> for MemoryStore {
    type Output = Option<Comment>;
    type Error = StoreError;
    async fn process(&self, query: DeleteCommentById) -> Result<Option<Comment>, StoreError> {
        let mut tables = self.begin().await?;
        let position = tables.comments.iter().position(|c| c.id == query.id);
        Ok(position.map(|index| tables.comments.remove(index)))
    }
}

impl Processor<DeleteCommentsByPost> for MemoryStore {
    type Output = u64;
    type Error = StoreError;
    async fn process(&self, query: DeleteCommentsByPost) -> Result<u64, StoreError> {
        let mut tables = self.begin().await?;
        let before = tables.comments.len();
        tables.comments.retain(|c| c.post_id != query.post_id);
        Ok((before - tables.comments.len()) as u64)
    }
}

impl Processor<InsertPost> for MemoryStore {
    type Output = Post;
    type Error = StoreError;
    async fn process(&self, insert: InsertPost) -> Result<Post, StoreError> {
        let mut tables = self.begin().await?;
        let post = Post {
            id: Uuid::now_v7(),
            author_id: insert.author_id,
            text: insert.text,
            created_at: now(),
        };
        tables.posts.push(post.clone());
        Ok(post)
    }
}

impl Processor<GetPostById> for MemoryStore {
    type Output = Option<Post>;
    type Error = StoreError;
    async fn process(&self, query: GetPostById) -> Result<Option<Post>, StoreError> {
        let tables = self.begin().await?;
        Ok(tables.posts.iter().find(|p| p.id == query.id).cloned())
    }
}

impl Processor<GetPostsByIds> for MemoryStore {
    type Output = Vec<Post>;
    type Error = StoreError;
    async fn process(&self, query: GetPostsByIds) -> Result<Vec<Post>, StoreError> {
        let tables = self.begin().await?;
        Ok(tables
            .posts
            .iter()
            .filter(|p| query.ids.contains(&p.id))
            .cloned()
            .collect())
    }
}

impl Processor<ListPostsByAuthor> for MemoryStore {
    type Output = Vec<Post>;
    type Error = StoreError;
    async fn process(&self, query: ListPostsByAuthor) -> Result<Vec<Post>, StoreError> {
        let tables = self.begin().await?;
        Ok(tables
            .posts
            .iter()
            .filter(|p| p.author_id == query.author_id)
            .cloned()
            .collect())
    }
}

impl Processor<DeletePostById> for MemoryStore {
    type Output = Option<Post>;
    type Error = StoreError;
    async fn process(&self, query: DeletePostById) -> Result<Option<Post>, StoreError> {
        let mut tables = self.begin().await?;
        let position = tables.posts.iter().position(|p| p.id == query.id);
        Ok(position.map(|index| tables.posts.remove(index)))
    }
}

impl Processor<DeletePostsByAuthor> for MemoryStore {
    type Output = u64;
    type Error = StoreError;
    async fn process(&self, query: DeletePostsByAuthor) -> Result<u64, StoreError> {
        let mut tables = self.begin().await?;
        let before = tables.posts.len();
        tables
            .posts
            .retain(|p| p.author_id != query.author_id || !query.ids.contains(&p.id));
        Ok((before - tables.posts.len()) as u64)
    }
}
