//! Listening sockets for newly created proxies.
//!
//! # Responsibilities
//! - Bind the listen port of a new proxy before it joins the registry
//! - Share one socket between proxies on the same port
//! - Hand bound sockets to the transport layer
//!
//! # Design Decisions
//! - The registry only sees the `ProxyListener` trait; the accept loop and
//!   the client protocol live behind it
//! - Sockets are bound non-blocking so they can be adopted by Tokio

use std::net::TcpListener;
use std::sync::Arc;

use dashmap::DashMap;

use crate::proxy::instance::ProxyKey;

/// Error type for listen operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenError {
    #[error("failed to bind {host}:{port}: {source}")]
    Bind {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid listen port 0 for proxy {0}")]
    InvalidPort(String),
}

/// Opens the listening resource for a proxy.
pub trait ProxyListener: Send + Sync + std::fmt::Debug {
    /// Start listening for `key`; returns the number of sockets now serving it.
    fn listen(&self, key: &ProxyKey) -> Result<usize, ListenError>;
}

/// Binds real TCP sockets, one per distinct port.
#[derive(Debug)]
pub struct TcpListenerSet {
    host: String,
    bound: DashMap<u16, Arc<TcpListener>>,
}

impl TcpListenerSet {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            bound: DashMap::new(),
        }
    }

    /// The socket bound for `port`, if any.
    pub fn socket(&self, port: u16) -> Option<Arc<TcpListener>> {
        self.bound.get(&port).map(|s| s.value().clone())
    }

    /// Ports currently bound.
    pub fn ports(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = self.bound.iter().map(|e| *e.key()).collect();
        ports.sort_unstable();
        ports
    }
}

impl ProxyListener for TcpListenerSet {
    fn listen(&self, key: &ProxyKey) -> Result<usize, ListenError> {
        if key.port == 0 {
            return Err(ListenError::InvalidPort(key.name.clone()));
        }

        if self.bound.contains_key(&key.port) {
            tracing::debug!(proxy = %key, "Sharing existing listen socket");
            return Ok(1);
        }

        let bind_err = |source| ListenError::Bind {
            host: self.host.clone(),
            port: key.port,
            source,
        };
        let socket = TcpListener::bind((self.host.as_str(), key.port)).map_err(bind_err)?;
        socket.set_nonblocking(true).map_err(bind_err)?;

        tracing::info!(proxy = %key, host = %self.host, "Listener bound");
        self.bound.insert(key.port, Arc::new(socket));
        Ok(1)
    }
}
