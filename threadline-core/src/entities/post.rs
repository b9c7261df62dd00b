use crate::framework::DatabaseProcessor;
use crate::store::StoreError;
use kanau::processor::Processor;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: String,
    pub text: String,
    pub created_at: time::OffsetDateTime,
}

const POST_COLUMNS: &str = "id, author_id, text, created_at";

#[derive(Debug, Clone)]
pub struct InsertPost {
    pub author_id: String,
    pub text: String,
}

impl Processor<InsertPost> for DatabaseProcessor {
    type Output = Post;
    type Error = StoreError;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertPost")]
    async fn process(&self, insert: InsertPost) -> Result<Post, StoreError> {
        let post = sqlx::query_as::<_, Post>(&format!(
            r#"
            INSERT INTO posts (id, author_id, text)
            VALUES ($1, $2, $3)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(insert.author_id)
        .bind(insert.text)
        .fetch_one(&self.pool)
        .await?;
        Ok(post)
    }
}

#[derive(Debug, Clone)]
pub struct GetPostById {
    pub id: Uuid,
}

impl Processor<GetPostById> for DatabaseProcessor {
    type Output = Option<Post>;
    type Error = StoreError;
    #[tracing::instrument(skip_all, err, name = "SQL:GetPostById")]
    async fn process(&self, query: GetPostById) -> Result<Option<Post>, StoreError> {
        let post =
            sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
                .bind(query.id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(post)
    }
}

#[derive(Debug, Clone)]
/// Fetch several posts in a single query. Unknown ids are skipped.
pub struct GetPostsByIds {
    pub ids: Vec<Uuid>,
}

impl Processor<GetPostsByIds> for DatabaseProcessor {
    type Output = Vec<Post>;
    type Error = StoreError;
    #[tracing::instrument(skip_all, err, name = "SQL:GetPostsByIds")]
    async fn process(&self, query: GetPostsByIds) -> Result<Vec<Post>, StoreError> {
        if query.ids.is_empty() {
            return Ok(Vec::new());
        }

        let posts = sqlx::query_as::<_, Post>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            WHERE id = ANY($1)
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(query.ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }
}

#[derive(Debug, Clone)]
pub struct ListPostsByAuthor {
    pub author_id: String,
}

impl Processor<ListPostsByAuthor> for DatabaseProcessor {
    type Output = Vec<Post>;
    type Error = StoreError;
    #[tracing::instrument(skip_all, err, name = "SQL:ListPostsByAuthor")]
    async fn process(&self, query: ListPostsByAuthor) -> Result<Vec<Post>, StoreError> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            WHERE author_id = $1
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(query.author_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }
}

#[derive(Debug, Clone)]
/// Delete one post by id, returning it if it was still present.
pub struct DeletePostById {
    pub id: Uuid,
}

impl Processor<DeletePostById> for DatabaseProcessor {
    type Output = Option<Post>;
    type Error = StoreError;
    #[tracing::instrument(skip_all, err, name = "SQL:DeletePostById")]
    async fn process(&self, query: DeletePostById) -> Result<Option<Post>, StoreError> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "DELETE FROM posts WHERE id = $1 RETURNING {POST_COLUMNS}"
        ))
        .bind(query.id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }
}

#[derive(Debug, Clone)]
/// Delete the listed posts of an author. Only the deleted count comes back.
///
/// Posts of the author that are not in `ids` are left alone.
pub struct DeletePostsByAuthor {
    pub author_id: String,
    pub ids: Vec<Uuid>,
}

impl Processor<DeletePostsByAuthor> for DatabaseProcessor {
    type Output = u64;
    type Error = StoreError;
    #[tracing::instrument(skip_all, err, name = "SQL:DeletePostsByAuthor")]
    async fn process(&self, query: DeletePostsByAuthor) -> Result<u64, StoreError> {
        if query.ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM posts WHERE author_id = $1 AND id = ANY($2)")
            .bind(query.author_id)
            .bind(query.ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
