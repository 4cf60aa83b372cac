//! Configuration management for the lobby server.
//!
//! This module handles loading, validation, and conversion of server configuration
//! from TOML files and command-line arguments.

use lobby_server::{ServerConfig, SessionConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

fn default_max_connections() -> usize {
    1000
}

fn default_write_wait_secs() -> u64 {
    20
}

fn default_pong_wait_secs() -> u64 {
    120
}

fn default_max_message_size() -> usize {
    5120
}

fn default_max_username_len() -> usize {
    14
}

fn default_queue_capacity() -> usize {
    256
}

fn default_max_coalesce() -> usize {
    64
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Listener settings
    pub server: ServerSettings,
    /// Per-connection protocol settings
    #[serde(default)]
    pub session: SessionSettings,
    /// Logging configuration settings
    pub logging: LoggingSettings,
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Network address to bind the server to (e.g., "127.0.0.1:8080")
    pub bind_address: String,
    /// Maximum number of concurrent players
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Protocol timings, limits and queue sizes applied to every session.
///
/// The heartbeat period is not configurable on its own; it is always nine
/// tenths of `pong_wait_secs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Time allowed for a single write, in seconds
    #[serde(default = "default_write_wait_secs")]
    pub write_wait_secs: u64,
    /// Silence tolerated before the peer is presumed dead, in seconds
    #[serde(default = "default_pong_wait_secs")]
    pub pong_wait_secs: u64,
    /// Largest accepted inbound message, in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Longest accepted username, in characters
    #[serde(default = "default_max_username_len")]
    pub max_username_len: usize,
    #[serde(default = "default_queue_capacity")]
    pub inbound_queue_capacity: usize,
    #[serde(default = "default_queue_capacity")]
    pub outbound_queue_capacity: usize,
    /// Most queued responses merged into one outgoing message
    #[serde(default = "default_max_coalesce")]
    pub max_coalesce: usize,
}

/// Logging system configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            write_wait_secs: default_write_wait_secs(),
            pong_wait_secs: default_pong_wait_secs(),
            max_message_size: default_max_message_size(),
            max_username_len: default_max_username_len(),
            inbound_queue_capacity: default_queue_capacity(),
            outbound_queue_capacity: default_queue_capacity(),
            max_coalesce: default_max_coalesce(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                bind_address: "127.0.0.1:8080".to_string(),
                max_connections: default_max_connections(),
            },
            session: SessionSettings::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the specified path
    /// and returns the default configuration.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Converts the application configuration to the server library's configuration.
    pub fn to_server_config(&self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        let session = &self.session;
        Ok(ServerConfig {
            bind_address: self.server.bind_address.parse()?,
            max_connections: self.server.max_connections,
            session: SessionConfig {
                write_wait: Duration::from_secs(session.write_wait_secs),
                pong_wait: Duration::from_secs(session.pong_wait_secs),
                max_message_size: session.max_message_size,
                max_username_len: session.max_username_len,
                inbound_queue_capacity: session.inbound_queue_capacity,
                outbound_queue_capacity: session.outbound_queue_capacity,
                max_coalesce: session.max_coalesce,
            },
        })
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!(
                "Invalid bind address: {}",
                &self.server.bind_address
            ));
        }

        if self.server.max_connections == 0 {
            return Err("server.max_connections must be greater than 0".to_string());
        }

        let session = &self.session;
        if session.write_wait_secs == 0 || session.pong_wait_secs == 0 {
            return Err("session timeouts must be greater than 0".to_string());
        }
        let limits = [
            ("session.max_message_size", session.max_message_size),
            ("session.max_username_len", session.max_username_len),
            ("session.inbound_queue_capacity", session.inbound_queue_capacity),
            ("session.outbound_queue_capacity", session.outbound_queue_capacity),
            ("session.max_coalesce", session.max_coalesce),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(format!("{name} must be greater than 0"));
            }
        }

        let pong_wait = Duration::from_secs(session.pong_wait_secs);
        let ping_period = pong_wait * 9 / 10;
        if ping_period.is_zero() || ping_period >= pong_wait {
            return Err(format!(
                "Ping period {ping_period:?} must be shorter than pong wait {pong_wait:?}"
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};
    use tokio::fs;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert_eq!(config.server.max_connections, 1000);
        assert_eq!(config.session, SessionSettings::default());
        assert_eq!(config.session.pong_wait_secs, 120);
        assert_eq!(config.session.max_coalesce, 64);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_converts_to_library_defaults() {
        let server_config = AppConfig::default()
            .to_server_config()
            .expect("Default config should convert to ServerConfig");
        assert_eq!(server_config.max_connections, 1000);
        assert_eq!(server_config.session, SessionConfig::default());
        assert_eq!(server_config.session.ping_period(), Duration::from_secs(108));
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.server.bind_address = "invalid".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.session.max_coalesce = 0;
        assert!(config
            .validate()
            .unwrap_err()
            .contains("session.max_coalesce"));

        let mut config = AppConfig::default();
        config.session.pong_wait_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.server.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_short_pong_wait_is_still_valid() {
        let mut config = AppConfig::default();
        config.session.pong_wait_secs = 1;
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_from_nonexistent_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(path.exists(), "default config file should be written");

        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded, config);
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let toml_content = r#"
[server]
bind_address = "0.0.0.0:3000"
max_connections = 2000

[session]
pong_wait_secs = 60
max_coalesce = 8

[logging]
level = "debug"
json_format = true
"#;

        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), toml_content).await.unwrap();

        let config = AppConfig::load_from_file(temp_file.path()).await.unwrap();

        assert_eq!(config.server.bind_address, "0.0.0.0:3000");
        assert_eq!(config.server.max_connections, 2000);
        assert_eq!(config.session.pong_wait_secs, 60);
        assert_eq!(config.session.max_coalesce, 8);
        assert_eq!(config.session.write_wait_secs, 20, "unset keys fall back");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);

        let server_config = config.to_server_config().unwrap();
        assert_eq!(server_config.session.ping_period(), Duration::from_secs(54));
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_toml() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), "[server\nbind_address = ").await.unwrap();
        assert!(AppConfig::load_from_file(temp_file.path()).await.is_err());
    }
}
