// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Log verbosity, ordered from quietest to noisiest
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        };
        f.write_str(name)
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub access_log: bool,
    /// Access log format (common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "common".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub max_connections: Option<u64>,
    /// Seconds to wait for in-flight connections after the listener closes
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

const fn default_shutdown_timeout() -> u64 {
    30
}

impl PerformanceConfig {
    pub const fn drain_deadline(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_connections: None,
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Directory request paths are resolved against
    pub document_root: String,
    /// Value of the `Content-Type` header on every response
    pub content_type: String,
    /// Value of the `Server` header
    pub server_name: String,
    /// Text substituted for lines carrying the server marker
    pub content_server_name: String,
    /// Seconds to wait for the request line, 0 waits forever
    pub read_timeout: u64,
    pub max_request_line: usize,
}

impl HttpConfig {
    pub const fn read_deadline(&self) -> Option<Duration> {
        if self.read_timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(self.read_timeout))
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            document_root: ".".to_string(),
            content_type: "text/html".to_string(),
            server_name: "Jon's very own server".to_string(),
            content_server_name: "Luke's Server".to_string(),
            read_timeout: 30,
            max_request_line: 8192,
        }
    }
}
