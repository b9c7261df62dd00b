//! Post and comment operations as exposed to the API layer.
//!
//! Services validate input, run store queries and publish lifecycle events.
//! Event publishing never fails an operation.

pub mod comment;
pub mod post;

pub use comment::CommentService;
pub use post::{BulkPostDeletion, PostService};

use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Rejected before any mutation.
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Non-empty text, trimmed of surrounding whitespace.
pub(crate) fn require_text(text: &str) -> Result<String, ServiceError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ServiceError::Validation("text is required".to_string()));
    }
    Ok(text.to_string())
}
