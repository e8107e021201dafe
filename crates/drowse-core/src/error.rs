//! Error types for drowse-core

use std::net::SocketAddr;
use thiserror::Error;

/// Result type alias for drowse operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the drowse HTTP server
#[derive(Debug, Error)]
pub enum Error {
    /// The listening socket could not be established (port in use, permission denied)
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Hostname/port pair does not form a socket address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Route pattern rejected at registration
    #[error("Invalid route pattern: {0:?}")]
    InvalidPattern(String),

    /// Pattern registered twice
    #[error("Route already registered: {0}")]
    DuplicateRoute(String),

    /// Serving a single connection failed (usually the peer went away)
    #[error("Connection error: {0}")]
    Connection(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
