//! Instrumented request dispatch.
//!
//! # Responsibilities
//! - Build one adapter per route descriptor and bind it on the transport
//! - Time every handler call and record it in the metrics registry
//! - Translate outcomes through the mapping table in `response.rs`
//! - Emit exactly one `request.run` log entry per request
//!
//! # Per-request order
//! ```text
//! t0 → handler → record_request → response decision → log entry → write
//! ```
//!
//! # Design Decisions
//! - Adapters hold only shared read-only handles, so they are reentrant
//! - Metrics are recorded for every attempt, failures included
//! - No per-request timeout; a handler runs to completion
//! - A panicking handler becomes a 500, the serving task survives

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::Request,
    http::StatusCode,
    response::Response,
    routing::{on, MethodRouter},
    Router,
};
use chrono::Utc;
use futures_util::FutureExt;
use tracing::Level;

use crate::config::Config;
use crate::http::request::{RequestContext, X_REQUEST_ID};
use crate::http::response::{self, classify};
use crate::observability::metrics::MetricsRegistry;
use crate::routing::{Outcome, RouteDescriptor, RouteError, RouteTable};

/// Value of the `log_type` field on per-request log entries.
pub const REQUEST_LOG_TYPE: &str = "request.run";

/// A handler bound to its descriptor, logger and metrics registry.
#[derive(Clone)]
pub struct RequestAdapter {
    route: Arc<RouteDescriptor>,
    metrics: Arc<MetricsRegistry>,
    config: Arc<Config>,
}

impl RequestAdapter {
    pub fn new(route: RouteDescriptor, metrics: Arc<MetricsRegistry>, config: Arc<Config>) -> Self {
        Self {
            route: Arc::new(route),
            metrics,
            config,
        }
    }

    pub fn route(&self) -> &RouteDescriptor {
        &self.route
    }

    /// Run one request through the handler and instrumentation.
    pub async fn serve(self, request: Request) -> Response {
        let start = Instant::now();
        let log_date = Utc::now();

        let path = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_owned())
            .unwrap_or_else(|| request.uri().path().to_owned());
        let request_type = request.method().clone();
        let request_id = request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let ctx = RequestContext::new(request, self.config.clone(), self.route.name());
        let outcome = match AssertUnwindSafe(self.route.handler().call(ctx))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::error!(route_name = %self.route.name(), "Handler panicked");
                Outcome::error(StatusCode::INTERNAL_SERVER_ERROR, "handler panicked")
            }
        };

        self.metrics.record_request(
            start.elapsed(),
            outcome.status.as_u16(),
            self.route.method().as_str(),
            self.route.name(),
        );

        let Outcome { status, body, error } = outcome;
        let error = error.map(|e| e.to_string());
        let disposition = classify(status, error.is_some());

        if disposition.severity == Level::ERROR {
            tracing::error!(
                route_name = %self.route.name(),
                resp_code = status.as_u16(),
                error = error.as_deref(),
                "Status returning internal error"
            );
        }

        let response = response::render(disposition, status, body, error.as_deref());

        tracing::info!(
            error = error.as_deref(),
            log_type = REQUEST_LOG_TYPE,
            path = %path,
            request_type = %request_type,
            resp_code = response.status().as_u16(),
            log_date = %log_date.to_rfc3339(),
            route_name = %self.route.name(),
            request_id = request_id.as_deref(),
            "{}",
            self.route.name()
        );

        response
    }
}

/// Bind every route in `routes` onto a new router, in registration order.
///
/// Unmatched requests get the generic not-found response.
pub fn build_router(
    routes: &RouteTable,
    metrics: Arc<MetricsRegistry>,
    config: Arc<Config>,
) -> Result<Router, RouteError> {
    // Patterns shared by several methods go into a single method router.
    let mut bound: Vec<(String, MethodRouter)> = Vec::new();

    for route in routes.iter() {
        let filter = route.method_filter()?;

        tracing::info!(
            pattern = %route.pattern(),
            method = %route.method(),
            route_name = %route.name(),
            "Adding route"
        );

        let adapter = RequestAdapter::new(route.clone(), metrics.clone(), config.clone());
        let handler = move |request: Request| adapter.clone().serve(request);

        match bound.iter().position(|(pattern, _)| pattern == route.pattern()) {
            Some(pos) => {
                let (pattern, method_router) = bound.remove(pos);
                bound.insert(pos, (pattern, method_router.on(filter, handler)));
            }
            None => bound.push((route.pattern().to_string(), on(filter, handler))),
        }
    }

    let router = bound
        .into_iter()
        .fold(Router::new(), |router, (pattern, method_router)| {
            router.route(&pattern, method_router)
        })
        .fallback(|| async { response::not_found() });

    Ok(router)
}
