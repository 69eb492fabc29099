//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main):
//!     Config from env → Logger → Metrics registry → Routes → Bind listeners
//!
//! Shutdown (shutdown.rs):
//!     Signal received → trigger → both listeners stop accepting → drain → exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: logger, metrics or bind errors end the process
//! - Listeners start last (traffic only when instrumentation is ready)

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::wait_for_signal;
