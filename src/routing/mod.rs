//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Application startup:
//!     RouteDescriptor { name, method, pattern, handler }
//!     → table.rs (RouteTable::register, checked for duplicates)
//!     → http::dispatcher (one adapter per descriptor, bound on the transport)
//!
//! Per request:
//!     transport matches method + pattern
//!     → adapter calls handler.rs contract
//!     → Outcome { status, body, error }
//! ```
//!
//! # Design Decisions
//! - Path and method matching belong to the transport (axum), not to us
//! - Descriptors are immutable once built
//! - Route names are metric labels, so they must be unique

pub mod handler;
pub mod table;

pub use handler::{Handler, HandlerError, Outcome};
pub use table::{RouteDescriptor, RouteError, RouteTable};
