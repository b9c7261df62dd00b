//! Configuration module for threadline-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables.

pub mod file;
pub mod runtime;

use crate::config::file::{BackendKind, FileConfig};
use crate::config::runtime::{
    AuthConfig, ChannelBackend, ChannelConfig, ServerConfig, ServiceRole, SharedConfig,
};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use threadline_core::utils::backoff::ReconnectBackoff;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub channel: ChannelConfig,
}

impl LoadedConfig {
    /// Split off the sections that live behind locks at runtime.
    pub fn into_shared(self) -> (SharedConfig, ChannelConfig) {
        (SharedConfig::new(self.server, self.auth), self.channel)
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
    role_override: Option<ServiceRole>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(
        config_path: impl AsRef<Path>,
        listen_override: Option<SocketAddr>,
        role_override: Option<ServiceRole>,
    ) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
            role_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI and environment overrides
    /// 3. Validate the configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let file_config: FileConfig = toml::from_str(&config_content)?;
        let jwt_secret = std::env::var("JWT_SECRET").ok().filter(|s| !s.is_empty());
        self.build(file_config, jwt_secret)
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn build(
        &self,
        mut file_config: FileConfig,
        jwt_secret_env: Option<String>,
    ) -> Result<LoadedConfig, ConfigError> {
        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }
        if let Some(role) = self.role_override {
            file_config.server.role = role;
        }
        if let Some(secret) = jwt_secret_env {
            file_config.auth.jwt_secret = secret;
        }

        validate(&file_config)?;

        if file_config.auth.jwt_secret == file::DEFAULT_JWT_SECRET {
            tracing::warn!("Using the default JWT secret; set JWT_SECRET or [auth].jwt_secret");
        }

        let backend = match file_config.channel.backend {
            BackendKind::Local => ChannelBackend::Local,
            BackendKind::Redis => ChannelBackend::Redis {
                url: file_config.channel.redis_url.unwrap_or_default(),
            },
        };

        Ok(LoadedConfig {
            server: ServerConfig {
                listen: file_config.server.listen,
                role: file_config.server.role,
            },
            auth: AuthConfig {
                jwt_secret: file_config.auth.jwt_secret,
                fallback_user_id: file_config.auth.fallback_user_id,
            },
            channel: ChannelConfig {
                backend,
                subscriber_backoff: ReconnectBackoff::new(
                    Duration::from_secs(file_config.channel.backoff_initial_secs),
                    Duration::from_secs(file_config.channel.backoff_max_secs),
                ),
                publish_timeout: Duration::from_secs(file_config.channel.publish_timeout_secs),
            },
        })
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.auth.jwt_secret.is_empty() {
        return Err(ConfigError::ValidationError(
            "auth.jwt_secret must not be empty".to_string(),
        ));
    }
    if config.auth.fallback_user_id.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "auth.fallback_user_id must not be empty".to_string(),
        ));
    }

    let channel = &config.channel;
    if channel.backend == BackendKind::Local && config.server.role != ServiceRole::All {
        return Err(ConfigError::ValidationError(format!(
            "role \"{}\" needs channel.backend = \"redis\"; the local channel cannot reach another process",
            config.server.role
        )));
    }
    if channel.backend == BackendKind::Redis
        && channel.redis_url.as_deref().is_none_or(str::is_empty)
    {
        return Err(ConfigError::ValidationError(
            "channel.redis_url is required for the redis backend".to_string(),
        ));
    }
    if channel.backoff_initial_secs == 0 {
        return Err(ConfigError::ValidationError(
            "channel.backoff_initial_secs must be at least 1".to_string(),
        ));
    }
    if channel.backoff_max_secs < channel.backoff_initial_secs {
        return Err(ConfigError::ValidationError(
            "channel.backoff_max_secs must not be below backoff_initial_secs".to_string(),
        ));
    }
    if channel.publish_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "channel.publish_timeout_secs must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> FileConfig {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn test_overrides_apply() {
        let loader = ConfigLoader::new(
            "unused.toml",
            Some("127.0.0.1:9999".parse().unwrap()),
            Some(ServiceRole::Posts),
        );
        let loaded = loader
            .build(
                parse(
                    "[server]\nrole = \"comments\"\n[channel]\nbackend = \"redis\"\nredis_url = \"redis://cache:6379/\"\n",
                ),
                Some("from-env".to_string()),
            )
            .unwrap();
        assert_eq!(loaded.server.listen.port(), 9999);
        assert_eq!(loaded.server.role, ServiceRole::Posts);
        assert_eq!(loaded.auth.jwt_secret, "from-env");
        assert_eq!(
            loaded.channel.subscriber_backoff,
            ReconnectBackoff::default()
        );
        assert_eq!(loaded.channel.publish_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_split_role_needs_shared_channel() {
        for role in [ServiceRole::Posts, ServiceRole::Comments] {
            let loader = ConfigLoader::new("unused.toml", None, Some(role));
            let local = loader.build(parse("[server]\n[channel]\nbackend = \"local\"\n"), None);
            assert!(matches!(local, Err(ConfigError::ValidationError(_))));
        }

        let loader = ConfigLoader::new("unused.toml", None, None);
        let loaded = loader.build(parse("[server]\n"), None).unwrap();
        assert_eq!(loaded.server.role, ServiceRole::All);
        assert_eq!(loaded.channel.backend, ChannelBackend::Local);
    }

    #[test]
    fn test_redis_backend_needs_url() {
        let loader = ConfigLoader::new("unused.toml", None, None);
        let missing = loader.build(parse("[server]\n[channel]\nbackend = \"redis\"\n"), None);
        assert!(matches!(missing, Err(ConfigError::ValidationError(_))));

        let loaded = loader
            .build(
                parse(
                    "[server]\n[channel]\nbackend = \"redis\"\nredis_url = \"redis://cache:6379/\"\n",
                ),
                None,
            )
            .unwrap();
        assert_eq!(
            loaded.channel.backend,
            ChannelBackend::Redis {
                url: "redis://cache:6379/".to_string()
            }
        );
    }

    #[test]
    fn test_backoff_bounds_validated() {
        let loader = ConfigLoader::new("unused.toml", None, None);
        let zero = loader.build(parse("[server]\n[channel]\nbackoff_initial_secs = 0\n"), None);
        assert!(matches!(zero, Err(ConfigError::ValidationError(_))));

        let inverted = loader.build(
            parse("[server]\n[channel]\nbackoff_initial_secs = 10\nbackoff_max_secs = 5\n"),
            None,
        );
        assert!(matches!(inverted, Err(ConfigError::ValidationError(_))));

        let no_timeout = loader.build(parse("[server]\n[channel]\npublish_timeout_secs = 0\n"), None);
        assert!(matches!(no_timeout, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let loader = ConfigLoader::new("/nonexistent/threadline.toml", None, None);
        assert!(matches!(loader.load(), Err(ConfigError::IoError(_))));
    }
}
