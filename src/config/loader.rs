//! Configuration loading from the process environment.

use crate::config::schema::{
    Config, DEFAULT_BLUEPRINT_PATH, DEFAULT_LISTEN_PORT, DEFAULT_LOG_LEVEL,
    DEFAULT_METRICS_PATH, DEFAULT_METRICS_PORT,
};

pub const METRICS_PATH: &str = "METRICS_PATH";
pub const METRICS_PORT: &str = "METRICS_PORT";
pub const LISTEN_PORT: &str = "LISTEN_PORT";
pub const LOG_LEVEL: &str = "LOG_LEVEL";
pub const BLUEPRINT_PATH: &str = "BLUEPRINT_PATH";

/// Read an environment variable, falling back when it is unset or empty.
pub fn get_env(key: &str, fallback: &str) -> String {
    resolve(|k| std::env::var(k).ok(), key, fallback)
}

fn resolve<F>(lookup: F, key: &str, fallback: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.is_empty() => value,
        _ => fallback.to_string(),
    }
}

impl Config {
    /// Resolve every setting from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve every setting through `lookup`, using the default table for
    /// anything missing.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            metrics_path: resolve(&lookup, METRICS_PATH, DEFAULT_METRICS_PATH),
            metrics_port: resolve(&lookup, METRICS_PORT, DEFAULT_METRICS_PORT),
            listen_port: resolve(&lookup, LISTEN_PORT, DEFAULT_LISTEN_PORT),
            log_level: resolve(&lookup, LOG_LEVEL, DEFAULT_LOG_LEVEL),
            blueprint_path: resolve(&lookup, BLUEPRINT_PATH, DEFAULT_BLUEPRINT_PATH),
        }
    }
}
