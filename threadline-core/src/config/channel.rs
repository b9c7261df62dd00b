//! Event channel configuration.

use crate::events::{ChannelError, EventChannel, LocalFanout, RedisFanout};
use crate::utils::backoff::ReconnectBackoff;
use std::sync::Arc;
use std::time::Duration;

/// Which fanout implementation carries lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelBackend {
    /// In-process broadcast. Only reaches subscribers in the same process.
    Local,
    /// Redis PUBLISH/SUBSCRIBE.
    Redis { url: String },
}

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub backend: ChannelBackend,
    /// Rebind policy for the comment lifecycle subscriber.
    pub subscriber_backoff: ReconnectBackoff,
    /// Upper bound on a single publish from a request handler.
    pub publish_timeout: Duration,
}

impl ChannelBackend {
    /// Build the configured channel. Redis connects lazily, so this only
    /// fails on an invalid URL.
    pub fn open(&self) -> Result<Arc<dyn EventChannel>, ChannelError> {
        match self {
            ChannelBackend::Local => Ok(Arc::new(LocalFanout::new())),
            ChannelBackend::Redis { url } => Ok(Arc::new(RedisFanout::open(url)?)),
        }
    }
}
