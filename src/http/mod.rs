//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (service port)
//!     → server.rs (axum setup, request-id and trace layers)
//!     → [transport matches method + pattern]
//!     → dispatcher.rs (adapter: handler, metrics, log entry)
//!     → response.rs (outcome → status, headers, body)
//!     → Send to client
//!
//! TCP connection (metrics port)
//!     → observability::metrics exposition
//! ```

pub mod dispatcher;
pub mod request;
pub mod response;
pub mod server;

pub use dispatcher::{build_router, RequestAdapter};
pub use request::{marshal_body, RequestContext, X_REQUEST_ID};
pub use response::ErrorResponse;
pub use server::{HttpServer, ServerError};
