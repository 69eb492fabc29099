//! Request context handed to handlers.
//!
//! # Responsibilities
//! - Carry the inbound request, the shared config and the route name
//! - Decode bounded JSON request bodies
//! - Encode handler results as JSON outcomes
//!
//! # Design Decisions
//! - Request ID is set by the tower-http layer before the adapter runs
//! - Bodies are capped at 1 MiB; larger bodies are a read error

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::PathRejection, Path, Request},
    http::{HeaderMap, Method, StatusCode, Uri},
    RequestExt,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::config::Config;
use crate::routing::Outcome;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Upper bound for request bodies read by [`RequestContext::json`].
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Error type for request body decoding.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("could not read the JSON request body: {0}")]
    Read(#[source] axum::Error),

    #[error("could not unmarshal the request body: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Everything a handler gets for one request.
#[derive(Debug)]
pub struct RequestContext {
    request: Request,
    config: Arc<Config>,
    route_name: String,
}

impl RequestContext {
    pub fn new(request: Request, config: Arc<Config>, route_name: impl Into<String>) -> Self {
        Self {
            request,
            config,
            route_name: route_name.into(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn route_name(&self) -> &str {
        &self.route_name
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn into_request(self) -> Request {
        self.request
    }

    /// Deserialize the matched path parameters, e.g. `{id}` in `/items/{id}`.
    pub async fn path_params<T>(&mut self) -> Result<T, PathRejection>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let Path(params) = self.request.extract_parts::<Path<T>>().await?;
        Ok(params)
    }

    /// Take the body and decode it as JSON. The body is empty afterwards.
    pub async fn json<T: DeserializeOwned>(&mut self) -> Result<T, BodyError> {
        let body = std::mem::take(self.request.body_mut());
        read_json(body).await
    }
}

/// Read at most [`MAX_BODY_BYTES`] from `body` and decode it as JSON.
pub async fn read_json<T: DeserializeOwned>(body: Body) -> Result<T, BodyError> {
    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(BodyError::Read)?;
    serde_json::from_slice(&bytes).map_err(BodyError::Decode)
}

/// Encode `value` as a `200 OK` JSON outcome, or a 500 if encoding fails.
pub fn marshal_body<T: Serialize>(value: &T) -> Outcome {
    match serde_json::to_vec(value) {
        Ok(body) => Outcome::ok(body),
        Err(e) => Outcome::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("could not convert the response into JSON: {}", e),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Greeting {
        name: String,
    }

    fn context(body: impl Into<Body>) -> RequestContext {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/greet?lang=en")
            .header(X_REQUEST_ID, "abc-123")
            .body(body.into())
            .unwrap();
        RequestContext::new(request, Arc::new(Config::default()), "Greet")
    }

    #[tokio::test]
    async fn test_json_body_decodes() {
        let mut ctx = context(r#"{"name":"ada"}"#);
        let greeting: Greeting = ctx.json().await.unwrap();
        assert_eq!(greeting, Greeting { name: "ada".into() });
        assert_eq!(ctx.request_id(), Some("abc-123"));
        assert_eq!(ctx.route_name(), "Greet");
        assert_eq!(ctx.uri().query(), Some("lang=en"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_decode_error() {
        let mut ctx = context("{not json");
        let err = ctx.json::<Greeting>().await.unwrap_err();
        assert!(matches!(err, BodyError::Decode(_)));
    }

    #[tokio::test]
    async fn test_oversized_body_is_read_error() {
        let big = vec![b' '; MAX_BODY_BYTES + 1];
        let err = read_json::<Greeting>(Body::from(big)).await.unwrap_err();
        assert!(matches!(err, BodyError::Read(_)));
    }

    #[test]
    fn test_marshal_body() {
        let mut map = BTreeMap::new();
        map.insert("ok", true);
        let outcome = marshal_body(&map);
        assert_eq!(outcome.status, StatusCode::OK);
        assert_eq!(&outcome.body[..], br#"{"ok":true}"#);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_marshal_body_failure_is_500() {
        // JSON object keys must be strings
        let mut map = BTreeMap::new();
        map.insert(vec![1u8], 1);
        let outcome = marshal_body(&map);
        assert_eq!(outcome.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(outcome.is_error());
    }
}
