//! Delayed responder
//!
//! Answers any request with `200` and a fixed body after a fixed nap.
//! The nap is `tokio::time::sleep`, so only the task serving this request
//! is suspended.

use crate::config::{DEFAULT_BODY, DEFAULT_DELAY};
use crate::{handler_fn, Handler, Request, Response};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// The one handler: nap, then answer
#[derive(Debug, Clone)]
pub struct DelayedResponder {
    delay: Duration,
    body: Bytes,
}

impl Default for DelayedResponder {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY, DEFAULT_BODY)
    }
}

impl DelayedResponder {
    pub fn new(delay: Duration, body: impl Into<Bytes>) -> Self {
        Self {
            delay,
            body: body.into(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Log, nap, answer. Method, path, headers and body are ignored.
    pub async fn respond(&self, _req: &Request) -> Response {
        info!(
            "Serving request! After a nap of {} seconds...",
            self.delay.as_secs_f64()
        );
        tokio::time::sleep(self.delay).await;
        Response::text(self.body.clone())
    }

    /// Box as a router [`Handler`]
    pub fn into_handler(self) -> Handler {
        let responder = Arc::new(self);
        handler_fn(move |req| {
            let responder = responder.clone();
            async move { responder.respond(&req).await }
        })
    }
}
