//! Lifecycle events exchanged between the post and comment services.
//!
//! Events travel as UTF-8 JSON on plain string topics. There is no envelope,
//! version field or schema registry: the only contract is the `kind`
//! discriminator, which consumers check before trusting the rest of the
//! payload.
//!
//! ```json
//! {"kind":"PostDeleted","postId":"0190...","userId":"42","deletedAt":1727000000}
//! {"kind":"CommentDeleted","commentId":"0190...","deletedAt":1727000000}
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Topics used on the event channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Post lifecycle events, published by the post service.
    PostEvents,
    /// Comment lifecycle events, published by the comment service.
    CommentEvents,
}

impl Topic {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Topic::PostEvents => "post_events",
            Topic::CommentEvents => "comment_events",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A post or comment lifecycle event.
///
/// Deletion events drive the cross-service cascade. Creation events are
/// informational and ignored by the cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum LifecycleEvent {
    #[serde(rename_all = "camelCase")]
    PostCreated {
        post_id: Uuid,
        user_id: String,
        created_at: i64,
    },
    #[serde(rename_all = "camelCase")]
    PostDeleted {
        post_id: Uuid,
        /// The user who performed the deletion.
        user_id: String,
        /// Unix timestamp (seconds).
        deleted_at: i64,
    },
    #[serde(rename_all = "camelCase")]
    CommentCreated {
        comment_id: Uuid,
        post_id: Uuid,
        parent_id: Uuid,
        user_id: String,
        created_at: i64,
    },
    #[serde(rename_all = "camelCase")]
    CommentDeleted {
        comment_id: Uuid,
        /// Unix timestamp (seconds).
        deleted_at: i64,
    },
}

/// Every `kind` value this crate knows how to decode.
pub const KNOWN_KINDS: [&str; 4] = [
    "PostCreated",
    "PostDeleted",
    "CommentCreated",
    "CommentDeleted",
];

/// Why an inbound payload could not be turned into a [`LifecycleEvent`].
#[derive(Debug, thiserror::Error)]
pub enum EventParseError {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("payload has no string `kind` field")]
    MissingKind,
    #[error("unrecognized event kind `{0}`")]
    UnknownKind(String),
    #[error("malformed `{kind}` event: {source}")]
    InvalidShape {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

impl LifecycleEvent {
    /// The `kind` discriminator of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleEvent::PostCreated { .. } => "PostCreated",
            LifecycleEvent::PostDeleted { .. } => "PostDeleted",
            LifecycleEvent::CommentCreated { .. } => "CommentCreated",
            LifecycleEvent::CommentDeleted { .. } => "CommentDeleted",
        }
    }

    /// The topic this event is published on.
    pub fn topic(&self) -> Topic {
        match self {
            LifecycleEvent::PostCreated { .. } | LifecycleEvent::PostDeleted { .. } => {
                Topic::PostEvents
            }
            LifecycleEvent::CommentCreated { .. } | LifecycleEvent::CommentDeleted { .. } => {
                Topic::CommentEvents
            }
        }
    }

    /// Encode as a JSON payload.
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode an inbound payload.
    ///
    /// The discriminator is inspected before the payload is decoded into a
    /// concrete variant so that unknown kinds and malformed known kinds are
    /// reported separately.
    pub fn from_payload(payload: &[u8]) -> Result<Self, EventParseError> {
        let value: serde_json::Value =
            serde_json::from_slice(payload).map_err(EventParseError::InvalidJson)?;

        let kind = value
            .get("kind")
            .and_then(serde_json::Value::as_str)
            .ok_or(EventParseError::MissingKind)?
            .to_owned();

        if !KNOWN_KINDS.contains(&kind.as_str()) {
            return Err(EventParseError::UnknownKind(kind));
        }

        serde_json::from_value(value).map_err(|source| EventParseError::InvalidShape { kind, source })
    }
}
