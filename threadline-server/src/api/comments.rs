//! Comment API handlers.
//!
//! # Endpoints
//!
//! - `POST   /comments`                                  – create a comment as the caller
//! - `GET    /comments/parent/{parent_id}`               – direct replies to a post or comment
//! - `GET    /comments/post/{post_id}/parent/{parent_id}` – same, restricted to one post
//! - `PUT    /comments/{id}`                             – edit the text
//! - `DELETE /comments/{id}`                             – delete a comment and its replies
//! - `DELETE /comments/by-post/{post_id}`                – purge every comment of a post

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use threadline_core::entities::comment::Comment;
use threadline_core::services::ServiceError;
use threadline_sdk::objects::{
    CommentResponse, CreateCommentRequest, DeleteCommentResponse, ErrorResponse,
    PurgeCommentsResponse, UpdateCommentRequest,
};

use crate::api::extractors::Identity;
use crate::state::AppState;

/// Build the Comment API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_comment))
        .route("/parent/{parent_id}", get(list_by_parent))
        .route(
            "/post/{post_id}/parent/{parent_id}",
            get(list_by_post_and_parent),
        )
        .route("/{id}", put(update_comment).delete(delete_comment))
        .route("/by-post/{post_id}", delete(purge_post_comments))
}

fn to_response(comment: &Comment) -> CommentResponse {
    CommentResponse {
        id: comment.id,
        post_id: comment.post_id,
        parent_id: comment.parent_id,
        author_id: comment.author_id.clone(),
        text: comment.text.clone(),
        created_at: comment.created_at.unix_timestamp(),
        updated_at: comment.updated_at.unix_timestamp(),
    }
}

async fn create_comment(
    State(state): State<AppState>,
    Identity(user_id): Identity,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, CommentApiError> {
    let comment = state
        .comments
        .create_comment(
            &user_id,
            &payload.post_id,
            payload.parent_id.as_deref(),
            &payload.text,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(to_response(&comment))))
}

async fn list_by_parent(
    State(state): State<AppState>,
    Path(parent_id): Path<String>,
) -> Result<Json<Vec<CommentResponse>>, CommentApiError> {
    let comments = state.comments.list_by_parent(&parent_id).await?;
    Ok(Json(comments.iter().map(to_response).collect()))
}

async fn list_by_post_and_parent(
    State(state): State<AppState>,
    Path((post_id, parent_id)): Path<(String, String)>,
) -> Result<Json<Vec<CommentResponse>>, CommentApiError> {
    let comments = state
        .comments
        .list_by_post_and_parent(&post_id, &parent_id)
        .await?;
    Ok(Json(comments.iter().map(to_response).collect()))
}

async fn update_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<CommentResponse>, CommentApiError> {
    let comment = state.comments.update_comment(&id, &payload.text).await?;
    Ok(Json(to_response(&comment)))
}

/// Deletes a comment together with its whole thread.
///
/// One `CommentDeleted` is published per removed comment.
async fn delete_comment(
    State(state): State<AppState>,
    Identity(acting_user): Identity,
    Path(id): Path<String>,
) -> Result<Json<DeleteCommentResponse>, CommentApiError> {
    let deleted = state.comments.delete_comment(&id).await?;
    tracing::info!(comment_id = %id, acting_user, deleted = deleted.len(), "Comment thread deleted");
    Ok(Json(DeleteCommentResponse {
        message: "Comment and its replies deleted successfully".to_string(),
        deleted: deleted.iter().map(to_response).collect(),
    }))
}

async fn purge_post_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<PurgeCommentsResponse>, CommentApiError> {
    let (post_id, deleted_count) = state.comments.purge_post_comments(&post_id).await?;
    Ok(Json(PurgeCommentsResponse {
        post_id,
        deleted_count,
    }))
}

/// Errors that can occur in Comment API handlers.
#[derive(Debug)]
enum CommentApiError {
    Invalid(String),
    NotFound,
    /// A store query failed. Part of a thread may already be deleted.
    Internal(ServiceError),
}

impl From<ServiceError> for CommentApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(message) => CommentApiError::Invalid(message),
            ServiceError::NotFound => CommentApiError::NotFound,
            other => CommentApiError::Internal(other),
        }
    }
}

impl IntoResponse for CommentApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            CommentApiError::Invalid(message) => (StatusCode::BAD_REQUEST, message),
            CommentApiError::NotFound => (StatusCode::NOT_FOUND, "comment not found".to_string()),
            CommentApiError::Internal(e) => {
                tracing::error!(error = %e, "Comment API store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { message })).into_response()
    }
}
