//! Messages as they come off a subscription.

use bytes::Bytes;

/// A raw payload received on `topic`. Decoding happens in the consumer so a
/// malformed payload can be logged and skipped without tearing down the
/// subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Bytes,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: Bytes) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    /// Payload as text for logging. Invalid UTF-8 is replaced.
    pub fn payload_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}
