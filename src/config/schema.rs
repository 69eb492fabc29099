//! Configuration schema and default table.
//!
//! Values come only from the environment (see `loader.rs`); there is no
//! serialized config form.

pub const DEFAULT_METRICS_PATH: &str = "/metrics";
pub const DEFAULT_METRICS_PORT: &str = ":8090";
pub const DEFAULT_LISTEN_PORT: &str = "8080";
pub const DEFAULT_LOG_LEVEL: &str = "debug";
pub const DEFAULT_BLUEPRINT_PATH: &str = "blueprints";

/// Process-wide service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Path the metrics exposition is served on (`METRICS_PATH`).
    pub metrics_path: String,

    /// Port of the dedicated metrics listener (`METRICS_PORT`).
    pub metrics_port: String,

    /// Port of the service listener (`LISTEN_PORT`).
    pub listen_port: String,

    /// Log level name (`LOG_LEVEL`).
    pub log_level: String,

    /// Directory holding auxiliary resource definitions (`BLUEPRINT_PATH`).
    pub blueprint_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            metrics_path: DEFAULT_METRICS_PATH.to_string(),
            metrics_port: DEFAULT_METRICS_PORT.to_string(),
            listen_port: DEFAULT_LISTEN_PORT.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            blueprint_path: DEFAULT_BLUEPRINT_PATH.to_string(),
        }
    }
}

impl Config {
    /// Socket address for the service listener.
    pub fn listen_addr(&self) -> String {
        bind_address(&self.listen_port)
    }

    /// Socket address for the metrics listener.
    pub fn metrics_addr(&self) -> String {
        bind_address(&self.metrics_port)
    }
}

/// Accepts `8080`, `:8080` or a full `host:port`.
fn bind_address(port: &str) -> String {
    if let Some(bare) = port.strip_prefix(':') {
        format!("0.0.0.0:{}", bare)
    } else if port.contains(':') {
        port.to_string()
    } else {
        format!("0.0.0.0:{}", port)
    }
}
