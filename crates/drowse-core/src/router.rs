//! Handler registration
//!
//! An explicitly constructed [`Router`] is handed to the server instead of
//! registering handlers in process-wide state.
//!
//! ## Pattern syntax
//! - `/health` - matches exactly `/health`
//! - `/files/` - matches `/files/` and everything below it
//! - `/` - matches every path
//!
//! An exact match wins over a subtree match; among subtree patterns the
//! longest one wins. The request method is never considered. Targets no
//! pattern covers (`OPTIONS *`, `CONNECT host:port`) go to the fallback
//! handler, or get a 404 when none is set.

use crate::{DelayedResponder, Error, Request, Response, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed async request handler
pub type Handler =
    Arc<dyn Fn(Request) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync>;

/// Wrap an async closure as a [`Handler`]
pub fn handler_fn<F, Fut>(f: F) -> Handler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |req| Box::pin(f(req)))
}

struct Route {
    pattern: String,
    handler: Handler,
}

impl Route {
    fn is_subtree(&self) -> bool {
        self.pattern.ends_with('/')
    }

    fn matches(&self, path: &str) -> bool {
        if self.is_subtree() {
            path.starts_with(&self.pattern)
        } else {
            path == self.pattern
        }
    }
}

/// Request router
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
    fallback: Option<Handler>,
}

impl Router {
    /// Create an empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Router serving `responder` for every request target
    pub fn with_responder(responder: DelayedResponder) -> Self {
        Self::new().fallback(responder.into_handler())
    }

    /// Handler for requests no pattern matches
    pub fn fallback(mut self, handler: Handler) -> Self {
        self.fallback = Some(handler);
        self
    }

    /// Register a handler for `pattern`
    pub fn route(mut self, pattern: &str, handler: Handler) -> Result<Self> {
        if !pattern.starts_with('/') {
            return Err(Error::InvalidPattern(pattern.to_string()));
        }
        if self.routes.iter().any(|r| r.pattern == pattern) {
            return Err(Error::DuplicateRoute(pattern.to_string()));
        }
        self.routes.push(Route {
            pattern: pattern.to_string(),
            handler,
        });
        Ok(self)
    }

    /// Find the handler for a path
    pub fn lookup(&self, path: &str) -> Option<&Handler> {
        self.routes
            .iter()
            .filter(|r| r.matches(path))
            .max_by_key(|r| (!r.is_subtree(), r.pattern.len()))
            .map(|r| &r.handler)
    }

    /// Run the matching handler, then the fallback, or answer 404
    pub async fn dispatch(&self, req: Request) -> Response {
        match self.lookup(&req.path).or(self.fallback.as_ref()) {
            Some(handler) => handler(req).await,
            None => Response::not_found(),
        }
    }
}
