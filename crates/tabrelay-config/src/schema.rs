//! Configuration schema definitions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Relay endpoint configuration (host side of the browser connection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_relay_host")]
    pub host: String,

    #[serde(default = "default_relay_port")]
    pub port: u16,

    /// How long a sent command may wait for its response.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Delay between checks while waiting for the dispatcher to connect.
    #[serde(default = "default_connect_poll_interval_ms")]
    pub connect_poll_interval_ms: u64,

    /// Number of checks before giving up with "extension unavailable".
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,

    /// A connection without a heartbeat for this long is reported as stale.
    #[serde(default = "default_stale_after_ms")]
    pub stale_after_ms: u64,
}

impl RelayConfig {
    /// Listen address as `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_poll_interval(&self) -> Duration {
        Duration::from_millis(self.connect_poll_interval_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_relay_host(),
            port: default_relay_port(),
            request_timeout_ms: default_request_timeout_ms(),
            connect_poll_interval_ms: default_connect_poll_interval_ms(),
            connect_attempts: default_connect_attempts(),
            stale_after_ms: default_stale_after_ms(),
        }
    }
}

fn default_relay_host() -> String {
    "127.0.0.1".to_string()
}

fn default_relay_port() -> u16 {
    8787
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_connect_poll_interval_ms() -> u64 {
    1_000
}

fn default_connect_attempts() -> u32 {
    10
}

fn default_stale_after_ms() -> u64 {
    60_000
}

/// Browser dispatcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// WebSocket URL of the relay endpoint.
    #[serde(default = "default_relay_url")]
    pub relay_url: String,

    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Chrome remote debugging endpoint used by the DevTools runtime.
    #[serde(default = "default_cdp_endpoint")]
    pub cdp_endpoint: String,
}

impl DispatcherConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            relay_url: default_relay_url(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            cdp_endpoint: default_cdp_endpoint(),
        }
    }
}

fn default_relay_url() -> String {
    "ws://127.0.0.1:8787".to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    3_000
}

fn default_heartbeat_interval_ms() -> u64 {
    20_000
}

fn default_cdp_endpoint() -> String {
    "http://127.0.0.1:9222".to_string()
}

/// Identity reported by the stdio protocol server on `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_name")]
    pub name: String,

    #[serde(default = "default_server_version")]
    pub version: String,

    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            version: default_server_version(),
            protocol_version: default_protocol_version(),
        }
    }
}

fn default_server_name() -> String {
    "browser-extension-mcp".to_string()
}

fn default_server_version() -> String {
    "0.1.0".to_string()
}

fn default_protocol_version() -> String {
    "2024-11-05".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also write daily-rotated log files.
    #[serde(default)]
    pub file: bool,

    #[serde(default = "default_log_directory")]
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: false,
            directory: default_log_directory(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_directory() -> String {
    "~/.tabrelay/logs".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_defaults() {
        let relay = RelayConfig::default();
        assert_eq!(relay.address(), "127.0.0.1:8787");
        assert_eq!(relay.request_timeout(), Duration::from_secs(5));
        assert_eq!(relay.connect_poll_interval(), Duration::from_secs(1));
        assert_eq!(relay.connect_attempts, 10);
        assert_eq!(relay.stale_after(), Duration::from_secs(60));
    }

    #[test]
    fn test_dispatcher_defaults() {
        let dispatcher = DispatcherConfig::default();
        assert_eq!(dispatcher.relay_url, "ws://127.0.0.1:8787");
        assert_eq!(dispatcher.reconnect_delay(), Duration::from_secs(3));
        assert_eq!(dispatcher.heartbeat_interval(), Duration::from_secs(20));
    }

    #[test]
    fn test_server_defaults() {
        let server = ServerConfig::default();
        assert_eq!(server.name, "browser-extension-mcp");
        assert_eq!(server.protocol_version, "2024-11-05");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: Config = toml::from_str("[relay]\nport = 9000\n").unwrap();
        assert_eq!(config.relay.port, 9000);
        assert_eq!(config.relay.request_timeout_ms, 5_000);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.file);
    }
}
