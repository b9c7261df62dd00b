//! Post API request and response types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for creating a post.
///
/// The author is the resolved caller identity, never a body field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub text: String,
}

/// Request body for fetching several posts at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetPostsRequest {
    pub ids: Vec<Uuid>,
}

/// A post as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub author_id: String,
    pub text: String,
    /// Unix timestamp of when the post was created.
    pub created_at: i64,
}

/// Response for deleting every post of a user.
///
/// `posts` is the set captured before the bulk delete ran; `deleted_count`
/// is what the store reported afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkDeletePostsResponse {
    pub deleted_count: u64,
    pub posts: Vec<PostResponse>,
}
