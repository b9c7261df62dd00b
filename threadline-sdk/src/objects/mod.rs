pub mod comment;
pub mod events;
pub mod post;

pub use comment::{
    CommentResponse, CreateCommentRequest, DeleteCommentResponse, PurgeCommentsResponse,
    UpdateCommentRequest,
};
pub use events::{EventParseError, LifecycleEvent, Topic};
pub use post::{BulkDeletePostsResponse, CreatePostRequest, GetPostsRequest, PostResponse};

/// Plain error body returned by every API endpoint on failure.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}
