//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the service router from the route table
//! - Wire up middleware (tracing, request ID)
//! - Serve service traffic and metrics on separate listeners
//! - Drain pending metric samples on a timer while serving
//! - Stop everything on the shutdown signal

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::http::dispatcher;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics::{metrics_router, MetricsRegistry, UPKEEP_INTERVAL};
use crate::routing::{RouteError, RouteTable};

/// Error type for server startup and serving.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {role} listener on {address}: {source}")]
    Bind {
        role: &'static str,
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP server for the instrumented service.
pub struct HttpServer {
    router: Router,
    metrics_router: Router,
    metrics: Arc<MetricsRegistry>,
    upkeep_interval: Duration,
    config: Arc<Config>,
}

impl HttpServer {
    /// Build the service and metrics routers.
    pub fn new(
        config: Arc<Config>,
        routes: RouteTable,
        metrics: Arc<MetricsRegistry>,
    ) -> Result<Self, ServerError> {
        let router = dispatcher::build_router(&routes, metrics.clone(), config.clone())?
            .layer(PropagateRequestIdLayer::x_request_id())
            // failures are logged by the dispatcher's mapping table
            .layer(TraceLayer::new_for_http().on_failure(()))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));
        let metrics_router = metrics_router(&config.metrics_path, metrics.clone());

        Ok(Self {
            router,
            metrics_router,
            metrics,
            upkeep_interval: UPKEEP_INTERVAL,
            config,
        })
    }

    /// Override the metrics upkeep period.
    pub fn with_upkeep_interval(mut self, interval: Duration) -> Self {
        self.upkeep_interval = interval;
        self
    }

    /// Bind the service and metrics listeners from the config.
    pub async fn bind(config: &Config) -> Result<(TcpListener, TcpListener), ServerError> {
        let listener = bind_one("service", config.listen_addr()).await?;
        let metrics_listener = bind_one("metrics", config.metrics_addr()).await?;
        Ok((listener, metrics_listener))
    }

    /// Serve until `shutdown` fires or its coordinator is dropped.
    ///
    /// A trigger that happens before this future is first polled still stops it.
    pub async fn run(
        self,
        listener: TcpListener,
        metrics_listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        let metrics_addr = metrics_listener.local_addr()?;
        tracing::info!(
            address = %addr,
            metrics_address = %metrics_addr,
            metrics_path = %self.config.metrics_path,
            "HTTP server starting"
        );

        let service = axum::serve(listener, self.router)
            .with_graceful_shutdown(wait_for(shutdown.clone()))
            .into_future();
        let exposition = axum::serve(metrics_listener, self.metrics_router)
            .with_graceful_shutdown(wait_for(shutdown.clone()))
            .into_future();
        let metrics = self.metrics;
        let interval = self.upkeep_interval;
        let upkeep = async {
            metrics.run_upkeep_every(interval, wait_for(shutdown)).await;
            Ok::<(), std::io::Error>(())
        };

        tokio::try_join!(service, exposition, upkeep)?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The service router, layers included.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// The metrics exposition router.
    pub fn metrics_router(&self) -> Router {
        self.metrics_router.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

async fn bind_one(role: &'static str, address: String) -> Result<TcpListener, ServerError> {
    match TcpListener::bind(&address).await {
        Ok(listener) => {
            tracing::info!(role, address = %address, "Listener bound");
            Ok(listener)
        }
        Err(source) => Err(ServerError::Bind { role, address, source }),
    }
}

async fn wait_for(mut shutdown: ShutdownSignal) {
    shutdown.recv().await;
}
