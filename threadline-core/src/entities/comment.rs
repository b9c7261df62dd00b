use crate::framework::DatabaseProcessor;
use crate::store::StoreError;
use kanau::processor::Processor;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    /// The post id for top-level comments, otherwise the replied-to comment.
    pub parent_id: Uuid,
    pub author_id: String,
    pub text: String,
    pub created_at: time::OffsetDateTime,
    pub updated_at: time::OffsetDateTime,
}

impl Comment {
    pub fn is_top_level(&self) -> bool {
        self.parent_id == self.post_id
    }
}

const COMMENT_COLUMNS: &str = "id, post_id, parent_id, author_id, text, created_at, updated_at";

#[derive(Debug, Clone)]
/// Insert a new comment. The store assigns the id and timestamps.
pub struct InsertComment {
    pub post_id: Uuid,
    pub parent_id: Uuid,
    pub author_id: String,
    pub text: String,
}

impl Processor<InsertComment> for DatabaseProcessor {
    type Output = Comment;
    type Error = StoreError;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertComment")]
    async fn process(&self, insert: InsertComment) -> Result<Comment, StoreError> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            r#"
            INSERT INTO comments (id, post_id, parent_id, author_id, text)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(insert.post_id)
        .bind(insert.parent_id)
        .bind(insert.author_id)
        .bind(insert.text)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }
}

#[derive(Debug, Clone)]
pub struct GetCommentById {
    pub id: Uuid,
}

impl Processor<GetCommentById> for DatabaseProcessor {
    type Output = Option<Comment>;
    type Error = StoreError;
    #[tracing::instrument(skip_all, err, name = "SQL:GetCommentById")]
    async fn process(&self, query: GetCommentById) -> Result<Option<Comment>, StoreError> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(query.id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }
}

#[derive(Debug, Clone)]
/// Direct children of a post or comment, oldest first.
pub struct ListCommentsByParent {
    pub parent_id: Uuid,
}

impl Processor<ListCommentsByParent> for DatabaseProcessor {
    type Output = Vec<Comment>;
    type Error = StoreError;
    #[tracing::instrument(skip_all, err, name = "SQL:ListCommentsByParent")]
    async fn process(&self, query: ListCommentsByParent) -> Result<Vec<Comment>, StoreError> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comments
            WHERE parent_id = $1
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(query.parent_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }
}

#[derive(Debug, Clone)]
pub struct ListCommentsByPostAndParent {
    pub post_id: Uuid,
    pub parent_id: Uuid,
}

impl Processor<ListCommentsByPostAndParent> for DatabaseProcessor {
    type Output = Vec<Comment>;
    type Error = StoreError;
    #[tracing::instrument(skip_all, err, name = "SQL:ListCommentsByPostAndParent")]
    async fn process(
        &self,
        query: ListCommentsByPostAndParent,
    ) -> Result<Vec<Comment>, StoreError> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comments
            WHERE post_id = $1 AND parent_id = $2
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(query.post_id)
        .bind(query.parent_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }
}

#[derive(Debug, Clone)]
/// Replace the text of a comment, returning the updated record if it exists.
pub struct UpdateCommentText {
    pub id: Uuid,
    pub text: String,
}

impl Processor<UpdateCommentText> for DatabaseProcessor {
    type Output = Option<Comment>;
    type Error = StoreError;
    #[tracing::instrument(skip_all, err, name = "SQL:UpdateCommentText")]
    async fn process(&self, update: UpdateCommentText) -> Result<Option<Comment>, StoreError> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            r#"
            UPDATE comments
            SET text = $2, updated_at = now()
            WHERE id = $1
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(update.id)
        .bind(update.text)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }
}

#[derive(Debug, Clone)]
/// Delete one comment by id, returning it if it was still present.
pub struct DeleteCommentById {
    pub id: Uuid,
}

impl Processor<DeleteCommentById> for DatabaseProcessor {
    type Output = Option<Comment>;
    type Error = StoreError;
    #[tracing::instrument(skip_all, err, name = "SQL:DeleteCommentById")]
    async fn process(&self, query: DeleteCommentById) -> Result<Option<Comment>, StoreError> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "DELETE FROM comments WHERE id = $1 RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(query.id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }
}

#[derive(Debug, Clone)]
/// Delete every comment of a post in one statement. Returns the deleted count.
pub struct DeleteCommentsByPost {
    pub post_id: Uuid,
}

impl Processor<DeleteCommentsByPost> for DatabaseProcessor {
    type Output = u64;
    type Error = StoreError;
    #[tracing::instrument(skip_all, err, name = "SQL:DeleteCommentsByPost")]
    async fn process(&self, query: DeleteCommentsByPost) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM comments WHERE post_id = $1")
            .bind(query.post_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
