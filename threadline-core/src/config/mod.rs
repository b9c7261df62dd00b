//! Configuration types for Threadline.
//!
//! These types represent the validated runtime configuration used by the server
//! and the long-lived processors. Loading and parsing is handled by the server
//! crate.

mod auth;
mod channel;
mod server;

pub use auth::AuthConfig;
pub use channel::{ChannelBackend, ChannelConfig};
pub use server::{ServerConfig, ServiceRole};

use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared configuration state with separate locks for each section.
///
/// Only the sections that can change at runtime are held here; the channel
/// configuration is consumed once at startup.
#[derive(Clone)]
pub struct SharedConfig {
    /// Server configuration (listen address, role).
    pub server: Arc<RwLock<ServerConfig>>,
    /// Identity resolution settings (reloadable via SIGHUP).
    pub auth: Arc<RwLock<AuthConfig>>,
}

impl SharedConfig {
    pub fn new(server: ServerConfig, auth: AuthConfig) -> Self {
        Self {
            server: Arc::new(RwLock::new(server)),
            auth: Arc::new(RwLock::new(auth)),
        }
    }
}
