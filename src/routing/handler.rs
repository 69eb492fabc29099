//! The handler contract every business-logic unit implements.

use std::future::Future;

use axum::body::Bytes;
use axum::http::StatusCode;
use futures_util::future::{BoxFuture, FutureExt};

use crate::http::request::RequestContext;

/// Error returned by a handler next to a non-success status.
pub type HandlerError = axum::BoxError;

/// Result of one handler invocation: the `(status, body, error)` triple.
///
/// When `error` is set the body is ignored and the dispatcher writes the
/// error response for `status` instead.
#[derive(Debug)]
pub struct Outcome {
    pub status: StatusCode,
    pub body: Bytes,
    pub error: Option<HandlerError>,
}

impl Outcome {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
            error: None,
        }
    }

    /// `200 OK` with the given body.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    pub fn error(status: StatusCode, error: impl Into<HandlerError>) -> Self {
        Self {
            status,
            body: Bytes::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// A unit of business logic bound to one route.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: RequestContext) -> BoxFuture<'static, Outcome>;
}

impl<F, Fut> Handler for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    fn call(&self, ctx: RequestContext) -> BoxFuture<'static, Outcome> {
        self(ctx).boxed()
    }
}
