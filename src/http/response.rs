//! Handler outcome to HTTP response mapping.
//!
//! # Responsibilities
//! - Decide the response shape and log severity for a `(status, error)` pair
//! - Write success bodies verbatim with the JSON content type
//! - Write `{"error", "time"}` payloads for handler errors
//!
//! # Design Decisions
//! - The table is total: every status without a dedicated arm gets the JSON
//!   error payload with the handler's own status
//! - Status is never inferred from the error value
//! - Encoding failures fall back to a fixed literal body
//!
//! | status | error | body                 | severity |
//! |--------|-------|----------------------|----------|
//! | any    | no    | handler body         | info     |
//! | 404    | yes   | generic not found    | info     |
//! | 500    | yes   | `{error, time}` JSON | error    |
//! | other  | yes   | `{error, time}` JSON | info     |

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::Level;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
const NOT_FOUND_BODY: &str = "404 page not found\n";
const FALLBACK_ERROR_BODY: &str = r#"{"error":"System failure, could not marshal out error"}"#;

/// Wire shape written when a handler reports an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub time: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            time: Utc::now(),
        }
    }

    /// JSON encoding, or the fixed fallback literal if encoding fails.
    pub fn to_bytes(&self) -> Bytes {
        match serde_json::to_vec(self) {
            Ok(body) => Bytes::from(body),
            Err(e) => {
                tracing::error!(error = %e, "Could not encode error response");
                Bytes::from_static(FALLBACK_ERROR_BODY.as_bytes())
            }
        }
    }
}

/// Response shape chosen for an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Handler body, written verbatim.
    Body,
    /// Generic not-found response.
    NotFound,
    /// `{"error", "time"}` JSON payload.
    ErrorPayload,
}

/// Shape and log severity for one outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disposition {
    pub shape: Shape,
    pub severity: Level,
}

/// The mapping table.
pub fn classify(status: StatusCode, has_error: bool) -> Disposition {
    let (shape, severity) = match (has_error, status) {
        (false, _) => (Shape::Body, Level::INFO),
        (true, StatusCode::NOT_FOUND) => (Shape::NotFound, Level::INFO),
        (true, StatusCode::INTERNAL_SERVER_ERROR) => (Shape::ErrorPayload, Level::ERROR),
        (true, _) => (Shape::ErrorPayload, Level::INFO),
    };
    Disposition { shape, severity }
}

/// Build the response for a classified outcome.
pub fn render(
    disposition: Disposition,
    status: StatusCode,
    body: Bytes,
    error: Option<&str>,
) -> Response {
    match disposition.shape {
        Shape::Body => json_response(status, body),
        Shape::NotFound => not_found(),
        Shape::ErrorPayload => {
            let payload = ErrorResponse::new(error.unwrap_or_default());
            json_response(status, payload.to_bytes())
        }
    }
}

/// The generic not-found response, shared with the router fallback.
pub fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)],
        NOT_FOUND_BODY,
    )
        .into_response()
}

fn json_response(status: StatusCode, body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(JSON_CONTENT_TYPE),
    );
    response
}
