//! Server configuration
//!
//! Port, delay and body are compile-time constants. [`ServerConfig`] only
//! exists so the library can be driven from code (tests bind port 0); the
//! binary always runs with [`ServerConfig::default`].

use crate::{Error, Result};
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

/// Port the server listens on
pub const DEFAULT_PORT: u16 = 8080;

/// Listen on all interfaces
pub const DEFAULT_HOSTNAME: &str = "0.0.0.0";

/// Nap taken before every response
pub const DEFAULT_DELAY: Duration = Duration::from_secs(3);

/// Body of every response
pub const DEFAULT_BODY: &str = "ciao :)";

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub hostname: String,
    /// Runtime worker threads
    pub workers: usize,
    pub delay: Duration,
    pub body: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            hostname: DEFAULT_HOSTNAME.to_string(),
            workers: num_cpus::get(),
            delay: DEFAULT_DELAY,
            body: DEFAULT_BODY.to_string(),
        }
    }
}

impl ServerConfig {
    /// Resolve `hostname:port` to the address to bind
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let host_port = format!("{}:{}", self.hostname, self.port);
        if let Ok(addr) = host_port.parse() {
            return Ok(addr);
        }
        (self.hostname.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", host_port, e)))?
            .next()
            .ok_or(Error::InvalidAddress(host_port))
    }
}
