//! Processors of the deletion cascade.
//!
//! - `delete_tree`: removes a comment and its whole thread, called from the
//!   comment API path
//! - `PostLifecyclePublisher`: emits `PostCreated` / `PostDeleted` onto
//!   `post_events`
//! - `CommentLifecycleSubscriber`: receives `PostDeleted`, purges the post's
//!   comments

pub mod comment_subscriber;
pub mod comment_tree;
pub mod post_publisher;

pub use comment_subscriber::{
    CommentLifecycleSubscriber, Disposition, SubscriberError, SubscriberState,
};
pub use comment_tree::delete_tree;
pub use post_publisher::PostLifecyclePublisher;
