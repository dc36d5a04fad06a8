//! Configuration management for chargehub
//!
//! This module handles loading and validating configuration from defaults,
//! a TOML file and environment variables. Environment variables take
//! precedence over file values, and command-line flags (applied in the
//! binary) take precedence over both.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use crate::gateway::GatewayConfig;

/// Default MongoDB connection string
pub const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017";

/// Default database name
pub const DEFAULT_DATABASE: &str = "mydatabase";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Document store configuration
    pub database: DatabaseConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the listener binds to
    pub bind_address: SocketAddr,

    /// Enable permissive CORS headers
    pub enable_cors: bool,

    /// Emit a tracing span per HTTP request
    pub enable_request_logging: bool,
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// MongoDB connection string
    pub uri: String,

    /// Database holding the `data`, `batteries` and `stats` collections
    pub name: String,

    /// Application name reported to the server
    pub app_name: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            enable_cors: false,
            enable_request_logging: true,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: String::from(DEFAULT_MONGODB_URI),
            name: String::from(DEFAULT_DATABASE),
            app_name: Some(format!("chargehub/{}", env!("CARGO_PKG_VERSION"))),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

impl Config {
    /// Load configuration from environment variables on top of defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load from an optional file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Override values from `CHARGEHUB_*`, `PORT` and `MONGODB_URI` variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("CHARGEHUB_BIND_ADDRESS") {
            self.server.bind_address = addr
                .parse()
                .with_context(|| format!("Invalid CHARGEHUB_BIND_ADDRESS: {addr}"))?;
        }

        if let Ok(port) = std::env::var("PORT") {
            let port: u16 = port
                .parse()
                .with_context(|| format!("Invalid PORT: {port}"))?;
            self.server.bind_address.set_port(port);
        }

        if let Some(enable) = std::env::var("CHARGEHUB_ENABLE_CORS")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
        {
            self.server.enable_cors = enable;
        }

        if let Ok(uri) = std::env::var("MONGODB_URI").or_else(|_| std::env::var("DATABASE_URL")) {
            self.database.uri = uri;
        }

        if let Ok(name) = std::env::var("CHARGEHUB_DATABASE") {
            self.database.name = name;
        }

        if let Ok(level) = std::env::var("CHARGEHUB_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(format) = std::env::var("CHARGEHUB_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let uri = self.database.uri.trim();
        if uri.is_empty() {
            anyhow::bail!("database.uri must not be empty");
        }

        if !uri.starts_with("mongodb://") && !uri.starts_with("mongodb+srv://") {
            anyhow::bail!("database.uri must start with mongodb:// or mongodb+srv://");
        }

        if self.database.name.trim().is_empty() {
            anyhow::bail!("database.name must not be empty");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!(
                "logging.format must be 'text' or 'json', got '{}'",
                self.logging.format
            );
        }

        Ok(())
    }

    /// Gateway settings derived from the server section
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig::builder()
            .bind_address(self.server.bind_address)
            .enable_cors(self.server.enable_cors)
            .enable_request_logging(self.server.enable_request_logging)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn clear_env() {
        for key in [
            "CHARGEHUB_BIND_ADDRESS",
            "PORT",
            "CHARGEHUB_ENABLE_CORS",
            "MONGODB_URI",
            "DATABASE_URL",
            "CHARGEHUB_DATABASE",
            "CHARGEHUB_LOG_LEVEL",
            "CHARGEHUB_LOG_FORMAT",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.bind_address.port(), 3000);
        assert_eq!(config.database.name, "mydatabase");
    }

    #[test]
    fn test_invalid_uri_scheme() {
        let mut config = Config::default();
        config.database.uri = "postgres://localhost/db".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_database_name() {
        let mut config = Config::default();
        config.database.name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
bind_address = "127.0.0.1:8088"

[database]
name = "charging"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.bind_address.port(), 8088);
        assert!(config.server.enable_request_logging);
        assert_eq!(config.database.name, "charging");
        assert_eq!(config.database.uri, DEFAULT_MONGODB_URI);
        assert_eq!(config.logging.format, "text");
    }

    #[test]
    fn test_from_file_missing() {
        let result = Config::from_file(Path::new("/nonexistent/chargehub.toml"));
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var("PORT", "4100");
        std::env::set_var("MONGODB_URI", "mongodb://db.internal:27017");
        std::env::set_var("CHARGEHUB_DATABASE", "fleet");
        std::env::set_var("CHARGEHUB_ENABLE_CORS", "true");

        let config = Config::from_env().unwrap();
        assert_eq!(config.server.bind_address.port(), 4100);
        assert_eq!(config.database.uri, "mongodb://db.internal:27017");
        assert_eq!(config.database.name, "fleet");
        assert!(config.server.enable_cors);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_invalid_port() {
        clear_env();
        std::env::set_var("PORT", "not-a-port");
        assert!(Config::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_database_url_fallback() {
        clear_env();
        std::env::set_var("DATABASE_URL", "mongodb://fallback:27017");
        let config = Config::from_env().unwrap();
        assert_eq!(config.database.uri, "mongodb://fallback:27017");
        clear_env();
    }

    #[test]
    fn test_gateway_config_conversion() {
        let mut config = Config::default();
        config.server.enable_cors = true;
        let gateway = config.gateway_config();
        assert_eq!(gateway.bind_address, config.server.bind_address);
        assert!(gateway.enable_cors);
    }
}
