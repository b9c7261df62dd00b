//! Post API handlers.
//!
//! # Endpoints
//!
//! - `POST   /posts`                 – create a post as the caller
//! - `GET    /posts/{id}`            – fetch one post
//! - `POST   /posts/batch`           – fetch several posts by id
//! - `GET    /posts/user/{user_id}`  – list a user's posts
//! - `DELETE /posts/{id}`            – delete a post, publishing `PostDeleted`
//! - `DELETE /posts/user/{user_id}`  – delete every post of a user, one
//!   `PostDeleted` per post

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use threadline_core::entities::post::Post;
use threadline_core::services::ServiceError;
use threadline_sdk::objects::{
    BulkDeletePostsResponse, CreatePostRequest, ErrorResponse, GetPostsRequest, PostResponse,
};

use crate::api::extractors::Identity;
use crate::state::AppState;

/// Build the Post API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_post))
        .route("/batch", post(get_posts_by_ids))
        .route("/{id}", get(get_post).delete(delete_post))
        .route(
            "/user/{user_id}",
            get(list_user_posts).delete(delete_user_posts),
        )
}

/// Convert a `Post` (DB model) into a `PostResponse` (API model).
fn to_response(post: &Post) -> PostResponse {
    PostResponse {
        id: post.id,
        author_id: post.author_id.clone(),
        text: post.text.clone(),
        created_at: post.created_at.unix_timestamp(),
    }
}

async fn create_post(
    State(state): State<AppState>,
    Identity(user_id): Identity,
    Json(payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, PostApiError> {
    let post = state.posts.create_post(&user_id, &payload.text).await?;
    Ok((StatusCode::CREATED, Json(to_response(&post))))
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PostResponse>, PostApiError> {
    let post = state.posts.get_post(&id).await?;
    Ok(Json(to_response(&post)))
}

async fn get_posts_by_ids(
    State(state): State<AppState>,
    Json(payload): Json<GetPostsRequest>,
) -> Result<Json<Vec<PostResponse>>, PostApiError> {
    let posts = state.posts.get_posts_by_ids(payload.ids).await?;
    Ok(Json(posts.iter().map(to_response).collect()))
}

async fn list_user_posts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<PostResponse>>, PostApiError> {
    let posts = state.posts.list_posts_by_author(&user_id).await?;
    Ok(Json(posts.iter().map(to_response).collect()))
}

async fn delete_post(
    State(state): State<AppState>,
    Identity(acting_user): Identity,
    Path(id): Path<String>,
) -> Result<Json<PostResponse>, PostApiError> {
    let post = state.posts.delete_post(&id, &acting_user).await?;
    Ok(Json(to_response(&post)))
}

async fn delete_user_posts(
    State(state): State<AppState>,
    Identity(acting_user): Identity,
    Path(user_id): Path<String>,
) -> Result<Json<BulkDeletePostsResponse>, PostApiError> {
    let deletion = state
        .posts
        .delete_posts_by_author(&user_id, &acting_user)
        .await?;
    Ok(Json(BulkDeletePostsResponse {
        deleted_count: deletion.deleted_count,
        posts: deletion.posts.iter().map(to_response).collect(),
    }))
}

/// Errors that can occur in Post API handlers.
#[derive(Debug)]
enum PostApiError {
    Invalid(String),
    NotFound,
    /// A store query failed.
    Internal(ServiceError),
}

impl From<ServiceError> for PostApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(message) => PostApiError::Invalid(message),
            ServiceError::NotFound => PostApiError::NotFound,
            other => PostApiError::Internal(other),
        }
    }
}

impl IntoResponse for PostApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            PostApiError::Invalid(message) => (StatusCode::BAD_REQUEST, message),
            PostApiError::NotFound => (StatusCode::NOT_FOUND, "post not found".to_string()),
            PostApiError::Internal(e) => {
                tracing::error!(error = %e, "Post API store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { message })).into_response()
    }
}
