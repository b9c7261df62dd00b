//! Runtime configuration re-exports.
//!
//! The validated config types live in `threadline_core::config`; the server
//! only builds them from the file.

pub use threadline_core::config::{
    AuthConfig, ChannelBackend, ChannelConfig, ServerConfig, ServiceRole, SharedConfig,
};
