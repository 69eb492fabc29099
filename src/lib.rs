//! Instrumented HTTP request dispatch.
//!
//! Business logic implements [`routing::Handler`], returning an
//! [`routing::Outcome`] (`status`, `body`, `error`). The dispatcher wraps every
//! handler with latency and count metrics, one structured log entry per
//! request, and a fixed error-to-response mapping.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::Config;
pub use http::{HttpServer, RequestContext};
pub use lifecycle::{Shutdown, ShutdownSignal};
pub use observability::MetricsRegistry;
pub use routing::{Handler, Outcome, RouteDescriptor, RouteTable};
