//! Instrumented service (v1)
//!
//! Boots the dispatch scaffold with a few demonstration routes.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ service port ──▶ axum match ──▶ adapter ──▶ handler
//!                                               │
//!                                               ├─▶ metrics registry ◀── metrics port ◀── scraper
//!                                               └─▶ JSON log entry
//! ```

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde::Serialize;

use instrumented_router::http::{marshal_body, HttpServer, RequestContext};
use instrumented_router::lifecycle::{wait_for_signal, Shutdown};
use instrumented_router::observability::{init_logging, MetricsRegistry};
use instrumented_router::routing::{Outcome, RouteDescriptor, RouteTable};
use instrumented_router::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(Config::from_env());
    init_logging(&config)?;

    tracing::info!(
        listen_port = %config.listen_port,
        metrics_port = %config.metrics_port,
        metrics_path = %config.metrics_path,
        log_level = %config.log_level,
        "instrumented-router v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let metrics = Arc::new(MetricsRegistry::new()?);

    let routes = RouteTable::new()
        .with(RouteDescriptor::new("Health", Method::GET, "/health", health))?
        .with(RouteDescriptor::new("Echo", Method::POST, "/echo", echo))?
        .with(RouteDescriptor::new("Blueprints", Method::GET, "/blueprints", blueprints))?;

    let server = HttpServer::new(config.clone(), routes, metrics)?;
    let (listener, metrics_listener) = HttpServer::bind(&config).await?;

    let shutdown = Shutdown::new();
    let server_task = tokio::spawn(server.run(listener, metrics_listener, shutdown.subscribe()));

    wait_for_signal().await;
    shutdown.trigger();
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn health(_ctx: RequestContext) -> Outcome {
    Outcome::ok(r#"{"ok":true}"#)
}

async fn echo(mut ctx: RequestContext) -> Outcome {
    match ctx.json::<serde_json::Value>().await {
        Ok(value) => marshal_body(&value),
        Err(e) => Outcome::error(StatusCode::BAD_REQUEST, e),
    }
}

#[derive(Serialize)]
struct BlueprintList {
    path: String,
    files: Vec<String>,
}

/// Lists the files under `BLUEPRINT_PATH`.
async fn blueprints(ctx: RequestContext) -> Outcome {
    let path = ctx.config().blueprint_path.clone();
    let mut entries = match tokio::fs::read_dir(&path).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Outcome::error(StatusCode::NOT_FOUND, e)
        }
        Err(e) => return Outcome::error(StatusCode::INTERNAL_SERVER_ERROR, e),
    };

    let mut files = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => files.push(entry.file_name().to_string_lossy().into_owned()),
            Ok(None) => break,
            Err(e) => return Outcome::error(StatusCode::INTERNAL_SERVER_ERROR, e),
        }
    }
    files.sort();

    marshal_body(&BlueprintList { path, files })
}
