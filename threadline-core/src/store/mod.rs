//! Storage seam shared by the services.
//!
//! Every query is a plain struct handled through [`Processor`]. Postgres is
//! served by [`DatabaseProcessor`](crate::framework::DatabaseProcessor) and
//! tests use [`MemoryStore`]. Services are generic over the [`CommentStore`]
//! and [`PostStore`] aliases so either backend can be plugged in.

pub mod memory;

pub use memory::MemoryStore;

use crate::entities::comment::{
    Comment, DeleteCommentById, DeleteCommentsByPost, GetCommentById, InsertComment,
    ListCommentsByParent, ListCommentsByPostAndParent, UpdateCommentText,
};
use crate::entities::post::{
    DeletePostById, DeletePostsByAuthor, GetPostById, GetPostsByIds, InsertPost,
    ListPostsByAuthor, Post,
};
use kanau::processor::Processor;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Everything the comment side needs from storage.
pub trait CommentStore:
    Processor<InsertComment, Output = Comment, Error = StoreError>
    + Processor<GetCommentById, Output = Option<Comment>, Error = StoreError>
    + Processor<ListCommentsByParent, Output = Vec<Comment>, Error = StoreError>
    + Processor<ListCommentsByPostAndParent, Output = Vec<Comment>, Error = StoreError>
    + Processor<UpdateCommentText, Output = Option<Comment>, Error = StoreError>
    + Processor<DeleteCommentById, Output = Option<Comment>, Error = StoreError>
    + Processor<DeleteCommentsByPost, Output = u64, Error = StoreError>
    + Send
    + Sync
{
}

impl<T> CommentStore for T where
    T: Processor<InsertComment, Output = Comment, Error = StoreError>
        + Processor<GetCommentById, Output = Option<Comment>, Error = StoreError>
        + Processor<ListCommentsByParent, Output = Vec<Comment>, Error = StoreError>
        + Processor<ListCommentsByPostAndParent, Output = Vec<Comment>, Error = StoreError>
        + Processor<UpdateCommentText, Output = Option<Comment>, Error = StoreError>
        + Processor<DeleteCommentById, Output = Option<Comment>, Error = StoreError>
        + Processor<DeleteCommentsByPost, Output = u64, Error = StoreError>
        + Send
        + Sync
{
}

/// Everything the post side needs from storage.
pub trait PostStore:
    Processor<InsertPost, Output = Post, Error = StoreError>
    + Processor<GetPostById, Output = Option<Post>, Error = StoreError>
    + Processor<GetPostsByIds, Output = Vec<Post>, Error = StoreError>
    + Processor<ListPostsByAuthor, Output = Vec<Post>, Error = StoreError>
    + Processor<DeletePostById, Output = Option<Post>, Error = StoreError>
    + Processor<DeletePostsByAuthor, Output = u64, Error = StoreError>
    + Send
    + Sync
{
}

impl<T> PostStore for T where
    T: Processor<InsertPost, Output = Post, Error = StoreError>
        + Processor<GetPostById, Output = Option<Post>, Error = StoreError>
        + Processor<GetPostsByIds, Output = Vec<Post>, Error = StoreError>
        + Processor<ListPostsByAuthor, Output = Vec<Post>, Error = StoreError>
        + Processor<DeletePostById, Output = Option<Post>, Error = StoreError>
        + Processor<DeletePostsByAuthor, Output = u64, Error = StoreError>
        + Send
        + Sync
{
}
