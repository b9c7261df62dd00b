//! TOML file configuration structures.
//!
//! These structs directly map to the `threadline.toml` file format.

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use threadline_core::config::ServiceRole;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
    /// Which services this process hosts.
    #[serde(default = "default_role")]
    pub role: ServiceRole,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

fn default_role() -> ServiceRole {
    ServiceRole::All
}

/// Identity section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret for bearer tokens. `JWT_SECRET` takes precedence.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// User id assigned to requests without a valid token.
    #[serde(default = "default_fallback_user_id")]
    pub fallback_user_id: String,
}

pub(crate) const DEFAULT_JWT_SECRET: &str = "secret";

fn default_jwt_secret() -> String {
    DEFAULT_JWT_SECRET.to_string()
}

fn default_fallback_user_id() -> String {
    "123".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            fallback_user_id: default_fallback_user_id(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Local,
    Redis,
}

/// Event channel section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default)]
    pub backend: BackendKind,
    /// Required when `backend = "redis"`.
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "default_backoff_initial_secs")]
    pub backoff_initial_secs: u64,
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,
    #[serde(default = "default_publish_timeout_secs")]
    pub publish_timeout_secs: u64,
}

fn default_backoff_initial_secs() -> u64 {
    1
}

fn default_backoff_max_secs() -> u64 {
    64
}

fn default_publish_timeout_secs() -> u64 {
    2
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            redis_url: None,
            backoff_initial_secs: default_backoff_initial_secs(),
            backoff_max_secs: default_backoff_max_secs(),
            publish_timeout_secs: default_publish_timeout_secs(),
        }
    }
}
