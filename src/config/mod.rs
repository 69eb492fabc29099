//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! process environment (METRICS_PATH, METRICS_PORT, LISTEN_PORT, LOG_LEVEL, BLUEPRINT_PATH)
//!     → loader.rs (key lookup with compiled-in fallback)
//!     → Config (immutable)
//!     → shared via Arc to logger, metrics endpoint and dispatcher
//! ```
//!
//! # Design Decisions
//! - One typed struct, no accessor traits
//! - Every field has a default, so an empty environment is a valid config
//! - No validation beyond presence; malformed ports surface as bind errors

pub mod loader;
pub mod schema;

pub use loader::get_env;
pub use schema::Config;
