//! Route descriptors and the ordered route table.

use std::fmt;
use std::sync::Arc;

use axum::http::Method;
use axum::routing::MethodFilter;

use crate::routing::handler::Handler;

/// Error type for route registration.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("route name `{0}` is already registered")]
    DuplicateName(String),

    #[error("route {method} {pattern} is already registered")]
    DuplicateRoute { method: Method, pattern: String },

    #[error("method {0} cannot be routed")]
    UnsupportedMethod(Method),

    #[error("pattern `{0}` must start with '/'")]
    InvalidPattern(String),
}

/// Static metadata for one handler: metric label name, method and path.
#[derive(Clone)]
pub struct RouteDescriptor {
    name: String,
    method: Method,
    pattern: String,
    handler: Arc<dyn Handler>,
}

impl RouteDescriptor {
    pub fn new(
        name: impl Into<String>,
        method: Method,
        pattern: impl Into<String>,
        handler: impl Handler,
    ) -> Self {
        Self {
            name: name.into(),
            method,
            pattern: pattern.into(),
            handler: Arc::new(handler),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// Transport-level method filter for this route.
    pub fn method_filter(&self) -> Result<MethodFilter, RouteError> {
        MethodFilter::try_from(self.method.clone())
            .map_err(|_| RouteError::UnsupportedMethod(self.method.clone()))
    }
}

impl fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// Routes in registration order.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route.
    ///
    /// Rejects a repeated name (metric series would merge), a repeated
    /// method + pattern pair, a method the transport cannot route, and a
    /// pattern without a leading slash.
    pub fn register(&mut self, route: RouteDescriptor) -> Result<(), RouteError> {
        if !route.pattern.starts_with('/') {
            return Err(RouteError::InvalidPattern(route.pattern));
        }
        route.method_filter()?;

        for existing in &self.routes {
            if existing.name == route.name {
                return Err(RouteError::DuplicateName(route.name));
            }
            if existing.method == route.method && existing.pattern == route.pattern {
                return Err(RouteError::DuplicateRoute {
                    method: route.method,
                    pattern: route.pattern,
                });
            }
        }

        self.routes.push(route);
        Ok(())
    }

    /// Chained form of [`RouteTable::register`].
    pub fn with(mut self, route: RouteDescriptor) -> Result<Self, RouteError> {
        self.register(route)?;
        Ok(self)
    }

    pub fn all(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
