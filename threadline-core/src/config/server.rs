//! Server configuration.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Which services a process hosts.
///
/// The post and comment services are independent owners of their stores;
/// running both in one process is a deployment convenience, not a coupling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceRole {
    Posts,
    Comments,
    All,
}

impl ServiceRole {
    pub fn serves_posts(self) -> bool {
        matches!(self, ServiceRole::Posts | ServiceRole::All)
    }

    pub fn serves_comments(self) -> bool {
        matches!(self, ServiceRole::Comments | ServiceRole::All)
    }
}

impl std::str::FromStr for ServiceRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "posts" => Ok(ServiceRole::Posts),
            "comments" => Ok(ServiceRole::Comments),
            "all" => Ok(ServiceRole::All),
            other => Err(format!("unknown service role `{other}`")),
        }
    }
}

impl std::fmt::Display for ServiceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceRole::Posts => write!(f, "posts"),
            ServiceRole::Comments => write!(f, "comments"),
            ServiceRole::All => write!(f, "all"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub role: ServiceRole,
}
