//! Comment API request and response types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for creating a comment.
///
/// A missing `parent_id` attaches the comment directly to the post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    pub post_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub text: String,
}

/// Request body for editing a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCommentRequest {
    pub text: String,
}

/// A comment as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub post_id: Uuid,
    /// Either the post id (top-level comment) or another comment's id.
    pub parent_id: Uuid,
    pub author_id: String,
    pub text: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Response for deleting a comment together with its replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteCommentResponse {
    pub message: String,
    /// Every deleted comment, parents before their replies.
    pub deleted: Vec<CommentResponse>,
}

/// Response for purging every comment of a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeCommentsResponse {
    pub post_id: Uuid,
    pub deleted_count: u64,
}
