//! Native HTTP server implementation
//!
//! Accept loop over a tokio listener with:
//! - One spawned task per accepted connection
//! - hyper HTTP/1.1 connection handling
//! - TCP_NODELAY for low latency
//!
//! Binding failures come back as [`Error::Bind`]; deciding to exit is left
//! to the caller.

use crate::{Error, Request, Response, Result, Router, ServerConfig};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use socket2::{Domain, Protocol, Socket, Type};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// HTTP server owning its router
pub struct Server {
    config: ServerConfig,
    router: Arc<Router>,
    tracker: Arc<ConnectionTracker>,
}

impl Server {
    pub fn new(config: ServerConfig, router: Router) -> Self {
        Self {
            config,
            router: Arc::new(router),
            tracker: Arc::new(ConnectionTracker::new()),
        }
    }

    /// Open-connection counter shared with the accept loop
    pub fn tracker(&self) -> Arc<ConnectionTracker> {
        self.tracker.clone()
    }

    /// Open a listening socket on `addr`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(addr: SocketAddr) -> Result<TcpListener> {
        let socket = create_listener_socket(&addr).map_err(|source| Error::Bind { addr, source })?;
        let listener = TcpListener::from_std(socket.into())?;
        Ok(listener)
    }

    /// Bind the configured address and serve forever
    pub async fn run(self) -> Result<()> {
        let addr = self.config.socket_addr()?;
        let listener = Self::bind(addr)?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener.
    ///
    /// Only returns early if the listener's address cannot be read.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr()?;
        info!("Listening on http://{}", addr);

        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            if let Err(e) = stream.set_nodelay(true) {
                debug!(%peer, error = %e, "could not set TCP_NODELAY");
            }

            let router = self.router.clone();
            let guard = self.tracker.track();
            debug!(%peer, active = self.tracker.count(), "connection opened");

            tokio::spawn(async move {
                let _guard = guard;
                // Peers hanging up mid-nap land here; nothing to retry
                match serve_connection(stream, router).await {
                    Ok(()) => debug!(%peer, "connection closed"),
                    Err(e) => debug!(%peer, error = %e, "connection ended with error"),
                }
            });
        }
    }
}

async fn serve_connection(stream: TcpStream, router: Arc<Router>) -> Result<()> {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req| {
        let router = router.clone();
        async move { Ok::<_, Infallible>(handle_request(&router, req).await) }
    });

    http1::Builder::new()
        .serve_connection(io, service)
        .await
        .map_err(|e| Error::Connection(e.to_string()))
}

async fn handle_request(router: &Router, req: hyper::Request<Incoming>) -> hyper::Response<Full<Bytes>> {
    let request = from_hyper_request(&req);
    to_hyper_response(router.dispatch(request).await)
}

/// Create a listening TCP socket
pub fn create_listener_socket(addr: &SocketAddr) -> std::io::Result<Socket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    // SO_REUSEADDR - allow binding to address in TIME_WAIT
    socket.set_reuse_address(true)?;

    // TCP_NODELAY - disable Nagle's algorithm for lower latency
    socket.set_nodelay(true)?;

    socket.bind(&(*addr).into())?;
    socket.listen(1024)?;

    // tokio requires non-blocking std sockets
    socket.set_nonblocking(true)?;

    Ok(socket)
}

/// Convert a hyper request head to our Request type
pub fn from_hyper_request<B>(req: &hyper::Request<B>) -> Request {
    let uri = req.uri();
    let mut request = Request::new(req.method().clone(), uri.path());
    request.query = uri.query().map(|s| s.to_string());

    for (name, value) in req.headers() {
        if let Ok(v) = value.to_str() {
            request.headers.push((name.to_string(), v.to_string()));
        }
    }

    request
}

/// Convert our Response to hyper Response
pub fn to_hyper_response(res: Response) -> hyper::Response<Full<Bytes>> {
    let mut builder = hyper::Response::builder().status(res.status);

    for (name, value) in &res.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    match builder.body(Full::new(res.body)) {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "handler produced an invalid response");
            let fallback = Response::internal_error("Internal Server Error");
            let mut response = hyper::Response::new(Full::new(fallback.body));
            *response.status_mut() = fallback.status;
            response
        }
    }
}

// ============================================================================
// Connection Tracking
// ============================================================================

/// Counts open connections
#[derive(Debug, Default)]
pub struct ConnectionTracker {
    /// Currently open
    active: AtomicU64,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection; it stays counted until the guard drops
    pub fn track(self: &Arc<Self>) -> ConnectionGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            tracker: self.clone(),
        }
    }

    /// Get current open connection count
    #[inline]
    pub fn count(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }
}

/// Decrements the open count on drop
#[derive(Debug)]
pub struct ConnectionGuard {
    tracker: Arc<ConnectionTracker>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.tracker.active.fetch_sub(1, Ordering::SeqCst);
    }
}
