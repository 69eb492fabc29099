//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher and application code produce:
//!     → logging.rs (one structured entry per request, JSON)
//!     → metrics.rs (request histogram + counter, function summary)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint on its own port (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, parse_level, LoggingError};
pub use metrics::{FunctionTimer, Instrument, MetricsError, MetricsRegistry, UPKEEP_INTERVAL};
