//! HTTP API.
//!
//! - `posts`: mounted at `/posts` when the process serves posts
//! - `comments`: mounted at `/comments` when the process serves comments

use axum::Router;
use threadline_core::config::ServiceRole;

use crate::state::AppState;

pub mod comments;
pub mod extractors;
pub mod posts;

/// Build the API routes for the given role.
pub fn router(role: ServiceRole) -> Router<AppState> {
    let mut router = Router::new();
    if role.serves_posts() {
        router = router.nest("/posts", posts::router());
    }
    if role.serves_comments() {
        router = router.nest("/comments", comments::router());
    }
    router
}
