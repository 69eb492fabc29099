//! One structured entry per request, matching the status written.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::http::{Method, StatusCode};
use instrumented_router::{
    Config, HttpServer, MetricsRegistry, Outcome, RequestContext, RouteDescriptor, RouteTable,
};
use tower::ServiceExt;
use tracing::Level;

mod common;

async fn health(_ctx: RequestContext) -> Outcome {
    Outcome::ok(r#"{"ok":true}"#)
}

async fn db_down(_ctx: RequestContext) -> Outcome {
    Outcome::error(StatusCode::INTERNAL_SERVER_ERROR, "db unreachable")
}

async fn missing(_ctx: RequestContext) -> Outcome {
    Outcome::error(StatusCode::NOT_FOUND, "gone")
}

async fn teapot(_ctx: RequestContext) -> Outcome {
    Outcome::error(StatusCode::IM_A_TEAPOT, "short and stout")
}

fn server() -> HttpServer {
    let routes = RouteTable::new()
        .with(RouteDescriptor::new("Health", Method::GET, "/health", health))
        .and_then(|t| t.with(RouteDescriptor::new("DbDown", Method::GET, "/x", db_down)))
        .and_then(|t| t.with(RouteDescriptor::new("Missing", Method::DELETE, "/gone", missing)))
        .and_then(|t| t.with(RouteDescriptor::new("Teapot", Method::GET, "/tea", teapot)))
        .unwrap();
    HttpServer::new(
        Arc::new(Config::default()),
        routes,
        Arc::new(MetricsRegistry::new().unwrap()),
    )
    .unwrap()
}

async fn send(server: &HttpServer, method: Method, uri: &str) -> StatusCode {
    server
        .router()
        .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn test_success_entry_fields() {
    let (logs, _guard) = common::capture_logs();
    let server = server();

    let status = send(&server, Method::GET, "/health?verbose=1").await;
    assert_eq!(status, StatusCode::OK);

    let entries = logs.request_entries();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.level, Level::INFO);
    assert_eq!(entry.field("path"), Some("/health?verbose=1"));
    assert_eq!(entry.field("request_type"), Some("GET"));
    assert_eq!(entry.field("resp_code"), Some("200"));
    assert_eq!(entry.field("route_name"), Some("Health"));
    assert_eq!(entry.field("message"), Some("Health"));
    assert!(entry.field("error").is_none());
    assert!(entry.field("request_id").is_some());
    let log_date = entry.field("log_date").unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(log_date).is_ok());

    assert!(logs.at_level(Level::ERROR).is_empty());
}

#[tokio::test]
async fn test_internal_error_logs_once_at_error_severity() {
    let (logs, _guard) = common::capture_logs();
    let server = server();

    assert_eq!(send(&server, Method::GET, "/x").await, StatusCode::INTERNAL_SERVER_ERROR);

    let errors = logs.at_level(Level::ERROR);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field("error"), Some("db unreachable"));

    let entries = logs.request_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].level, Level::INFO);
    assert_eq!(entries[0].field("resp_code"), Some("500"));
    assert_eq!(entries[0].field("error"), Some("db unreachable"));
}

#[tokio::test]
async fn test_entry_status_matches_written_status() {
    let (logs, _guard) = common::capture_logs();
    let server = server();

    let cases = [
        (Method::GET, "/health"),
        (Method::GET, "/x"),
        (Method::DELETE, "/gone"),
        (Method::GET, "/tea"),
        (Method::GET, "/health"),
    ];
    let mut written = Vec::new();
    for (method, uri) in cases {
        written.push(send(&server, method, uri).await.as_u16().to_string());
    }

    let logged: Vec<String> = logs
        .request_entries()
        .iter()
        .map(|e| e.field("resp_code").unwrap().to_string())
        .collect();
    assert_eq!(logged, written);
    assert_eq!(written, vec!["200", "500", "404", "418", "200"]);

    // only the 500 is logged at error severity
    assert_eq!(logs.at_level(Level::ERROR).len(), 1);
}

#[tokio::test]
async fn test_unmatched_request_is_not_dispatched() {
    let (logs, _guard) = common::capture_logs();
    let server = server();

    assert_eq!(send(&server, Method::GET, "/unknown").await, StatusCode::NOT_FOUND);
    assert!(logs.request_entries().is_empty());
}
