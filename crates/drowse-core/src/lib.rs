//! drowse-core: slow-endpoint HTTP server core
//!
//! Every request, whatever its method or path, is answered with a fixed
//! `200` body after a fixed nap. The nap is an async timer, so each
//! connection runs in its own tokio task and a sleeping request never
//! holds up the accept loop or its neighbours.
//!
//! ## Example
//! ```no_run
//! use drowse_core::{DelayedResponder, Router, Server, ServerConfig};
//!
//! # async fn run() -> drowse_core::Result<()> {
//! let router = Router::with_responder(DelayedResponder::default());
//! Server::new(ServerConfig::default(), router).run().await
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod logging;
pub mod request;
pub mod responder;
pub mod response;
pub mod router;
pub mod server;

// Re-exports
pub use config::{ServerConfig, DEFAULT_BODY, DEFAULT_DELAY, DEFAULT_HOSTNAME, DEFAULT_PORT};
pub use error::{Error, Result};
pub use request::{Request, RequestBuilder};
pub use responder::DelayedResponder;
pub use response::{Response, ResponseBuilder};
pub use router::{handler_fn, Handler, Router};
pub use server::{create_listener_socket, from_hyper_request, to_hyper_response};
pub use server::{ConnectionGuard, ConnectionTracker, Server};
