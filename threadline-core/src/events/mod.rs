//! Event plumbing between the post and comment services.
//!
//! # Event Flow
//!
//! 1. Post deletion -> `PostDeleted` on `post_events`
//! 2. `CommentLifecycleSubscriber` consumes `post_events` and purges the
//!    post's comments
//! 3. Comment deletion -> one `CommentDeleted` per removed comment on
//!    `comment_events`
//!
//! Channels are fire-and-forget fanout. Consumers must tolerate duplicate,
//! missing and reordered events.

pub mod channels;
pub mod publisher;
pub mod redis_fanout;
pub mod types;

pub use channels::{
    ChannelError, DEFAULT_FANOUT_CAPACITY, EventChannel, LocalFanout, Subscription,
};
pub use publisher::{DEFAULT_PUBLISH_TIMEOUT, EventPublisher};
pub use redis_fanout::RedisFanout;
pub use types::InboundMessage;
