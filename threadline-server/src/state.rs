//! Application state shared across all request handlers.

use crate::config::runtime::SharedConfig;
use sqlx::PgPool;
use threadline_core::events::EventPublisher;
use threadline_core::framework::DatabaseProcessor;
use threadline_core::processors::PostLifecyclePublisher;
use threadline_core::services::{CommentService, PostService};

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Runtime configuration (auth can be reloaded via SIGHUP).
    pub config: SharedConfig,
    pub posts: PostService<DatabaseProcessor>,
    pub comments: CommentService<DatabaseProcessor>,
}

impl AppState {
    /// Create a new AppState. Both services query through `db`.
    pub fn new(db: PgPool, config: SharedConfig, events: EventPublisher) -> Self {
        let store = DatabaseProcessor::new(db);
        Self {
            posts: PostService::new(store.clone(), PostLifecyclePublisher::new(events.clone())),
            comments: CommentService::new(store, events),
            config,
        }
    }
}
