//! Structured logging.
//!
//! # Responsibilities
//! - Map the configured level name onto a tracing level
//! - Install the process-wide JSON subscriber
//!
//! # Design Decisions
//! - Level fixed at startup from config; `RUST_LOG` wins when present
//! - Unknown level names fall back to INFO instead of failing startup

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// Error type for logger installation.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to install log subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

/// Translate a level name into a tracing level.
pub fn parse_level(name: &str) -> Level {
    match name.trim().to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        // tracing has nothing above ERROR
        "error" | "fatal" | "panic" => Level::ERROR,
        _ => Level::INFO,
    }
}

const fn level_to_str(level: Level) -> &'static str {
    match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

/// Install the global subscriber using the configured level.
///
/// Fails if a subscriber is already installed.
pub fn init_logging(config: &Config) -> Result<(), LoggingError> {
    let level = parse_level(&config.log_level);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_to_str(level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(false),
        )
        .try_init()?;

    tracing::debug!(level = level_to_str(level), "Logger started");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_levels() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level("INFO"), Level::INFO);
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("fatal"), Level::ERROR);
        assert_eq!(parse_level("panic"), Level::ERROR);
        assert_eq!(parse_level("trace"), Level::TRACE);
    }

    #[test]
    fn test_unknown_level_falls_back_to_info() {
        assert_eq!(parse_level("verbose"), Level::INFO);
        assert_eq!(parse_level(""), Level::INFO);
    }

    #[test]
    fn test_default_config_level_is_debug() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(parse_level(&config.log_level), Level::DEBUG);
    }
}
