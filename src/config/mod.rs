// Configuration module entry point
// Loads layered configuration: config file, then environment, then defaults

mod types;

use std::net::SocketAddr;

pub use types::{Config, HttpConfig, LogLevel};

/// Default config file name (without extension)
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from the default `config.toml`, if present
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from specified file path (without extension)
    ///
    /// A missing file is not an error; environment variables prefixed with
    /// `WEBWORKER` override file values (`WEBWORKER__HTTP__DOCUMENT_ROOT=/srv`).
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let http = HttpConfig::default();
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("WEBWORKER")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("http.document_root", http.document_root)?
            .set_default("http.content_type", http.content_type)?
            .set_default("http.server_name", http.server_name)?
            .set_default("http.content_server_name", http.content_server_name)?
            .set_default("http.read_timeout", http.read_timeout)?
            .set_default("http.max_request_line", http.max_request_line as u64)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}
