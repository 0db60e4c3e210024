//! Server configuration.
//!
//! All structs deserialize with `serde` and fall back to defaults for missing
//! fields, so a config file only needs the values it changes.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use sipahi_core::Logger;
use sipahi_std::TransportOptions;
use std::collections::BTreeMap;
use tracing::Level;

/// Host used when `listen` is given none.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Configuration for a [`Server`](crate::Server).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Logger settings.
    pub logger: LoggerConfig,
    /// Largest inbound message, in bytes. `None` means unlimited.
    pub max_receive_message_length: Option<usize>,
    /// Largest outbound message, in bytes. `None` means unlimited.
    pub max_send_message_length: Option<usize>,
}

impl ServerConfig {
    /// The limits handed to the transport on bind.
    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            max_receive_message_length: self.max_receive_message_length,
            max_send_message_length: self.max_send_message_length,
        }
    }
}

/// Configuration for the shared logger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// When false, hooks and handlers get a logger that drops everything.
    pub enabled: bool,
    /// Service name recorded on the logger span.
    pub name: String,
    /// Most verbose level emitted: `trace`, `debug`, `info`, `warn` or `error`.
    pub level: String,
    /// Static properties attached to every event.
    pub properties: BTreeMap<String, String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: "sipahi".to_string(),
            level: "info".to_string(),
            properties: BTreeMap::new(),
        }
    }
}

impl LoggerConfig {
    /// Build the logger described by this configuration.
    pub fn build(&self) -> Result<Logger, ConfigError> {
        if !self.enabled {
            return Ok(Logger::disabled());
        }
        let level: Level = self
            .level
            .parse()
            .map_err(|_| ConfigError::InvalidLevel(self.level.clone()))?;
        let logger = Logger::new(self.name.as_str()).with_level(level);
        if self.properties.is_empty() {
            Ok(logger)
        } else {
            Ok(logger.child(self.properties.clone()))
        }
    }
}

/// Where to listen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenOptions {
    /// Host to bind; defaults to [`DEFAULT_HOST`].
    pub host: Option<String>,
    /// Port to bind. Required; `0` counts as missing.
    pub port: Option<u16>,
}

impl ListenOptions {
    /// Listen on `port` on the default host.
    pub fn new(port: u16) -> Self {
        Self {
            host: None,
            port: Some(port),
        }
    }

    /// Set the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Fill in the default host and check the port.
    pub fn resolve(&self) -> Result<(String, u16), ConfigError> {
        let port = match self.port {
            Some(port) if port != 0 => port,
            _ => return Err(ConfigError::MissingPort),
        };
        let host = match self.host.as_deref() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => DEFAULT_HOST.to_string(),
        };
        Ok((host, port))
    }
}
