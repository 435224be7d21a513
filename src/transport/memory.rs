//! In-memory connector.
//!
//! An in-process stand-in for a remote endpoint. It serves as the reference
//! implementation of the [`Connector`] contract and as the test harness for
//! the layers above it: the [`MemoryListener`] side can refuse connections,
//! count attempts, inject raw chunks and simulate a remote close.
//!
//! # Example
//!
//! ```ignore
//! let (connector, mut listener) = MemoryConnector::new();
//! let transport = Transport::new(TransportConfig::new("memory://test"), connector)?;
//! transport.connect();
//!
//! let mut peer = listener.accept().await.expect("connected");
//! peer.send("hello\n")?;
//! drop(peer); // remote close
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::trace;

use crate::error::{Error, Result};

use super::link::{Connector, Link};

// ============================================================================
// Shared State
// ============================================================================

#[derive(Debug, Default)]
struct Endpoint {
    refusing: AtomicBool,
    attempts: AtomicUsize,
}

// ============================================================================
// MemoryConnector
// ============================================================================

/// Client side of an in-memory endpoint.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    endpoint: Arc<Endpoint>,
    accepted: mpsc::UnboundedSender<MemoryPeer>,
}

impl MemoryConnector {
    /// Creates a connector and the listener that receives its connections.
    #[must_use]
    pub fn new() -> (Self, MemoryListener) {
        let endpoint = Arc::new(Endpoint::default());
        let (accepted, incoming) = mpsc::unbounded_channel();

        let connector = Self {
            endpoint: Arc::clone(&endpoint),
            accepted,
        };
        let listener = MemoryListener { endpoint, incoming };

        (connector, listener)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn open(&self, address: &str) -> Result<Link> {
        let attempt = self.endpoint.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(address, attempt, "Memory connect attempt");

        if self.endpoint.refusing.load(Ordering::SeqCst) {
            return Err(Error::connection(format!("{address} refused connection")));
        }

        let (writer, from_client) = mpsc::unbounded_channel();
        let (to_client, reader) = mpsc::unbounded_channel();

        self.accepted
            .send(MemoryPeer {
                to_client,
                from_client,
            })
            .map_err(|_| Error::connection(format!("{address} is no longer listening")))?;

        Ok(Link::new(writer, reader))
    }
}

// ============================================================================
// MemoryListener
// ============================================================================

/// Remote side of an in-memory endpoint.
#[derive(Debug)]
pub struct MemoryListener {
    endpoint: Arc<Endpoint>,
    incoming: mpsc::UnboundedReceiver<MemoryPeer>,
}

impl MemoryListener {
    /// Waits for the next accepted connection.
    ///
    /// Returns `None` once every connector clone is dropped.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.incoming.recv().await
    }

    /// Returns an already accepted connection without waiting.
    pub fn try_accept(&mut self) -> Option<MemoryPeer> {
        self.incoming.try_recv().ok()
    }

    /// Makes subsequent connection attempts fail (`true`) or succeed.
    pub fn refuse(&self, refusing: bool) {
        self.endpoint.refusing.store(refusing, Ordering::SeqCst);
    }

    /// Returns the number of connection attempts so far.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.endpoint.attempts.load(Ordering::SeqCst)
    }
}

// ============================================================================
// MemoryPeer
// ============================================================================

/// Remote end of one in-memory link.
///
/// Dropping the peer closes the link from the remote side.
#[derive(Debug)]
pub struct MemoryPeer {
    to_client: mpsc::UnboundedSender<String>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl MemoryPeer {
    /// Delivers a raw chunk to the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the client released the link.
    pub fn send(&self, chunk: impl Into<String>) -> Result<()> {
        self.to_client
            .send(chunk.into())
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Waits for the next raw text written by the client.
    ///
    /// Returns `None` once the client released the link.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Returns raw text already written by the client, without waiting.
    pub fn try_recv(&mut self) -> Option<String> {
        self.from_client.try_recv().ok()
    }

    /// Closes the link from the remote side.
    pub fn close(self) {
        drop(self);
    }
}

// ============================================================================
// Tests
// ============================================================================
