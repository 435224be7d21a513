//! Physical link abstraction.
//!
//! A [`Connector`] opens one physical duplex connection and hands back a
//! [`Link`]: a pair of channels pumped by a connector-owned task.
//!
//! | Physical event | Link representation |
//! |----------------|---------------------|
//! | open succeeded | `Connector::open` returns `Ok(Link)` |
//! | message | inbound channel yields a raw chunk |
//! | close | inbound channel yields `None` |
//! | send | outbound channel accepts raw text |
//!
//! Dropping the link's outbound sender asks the pump to close the
//! underlying connection.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use crate::error::{Error, Result};

use super::tcp::TcpConnector;
use super::websocket::WebSocketConnector;

// ============================================================================
// Types
// ============================================================================

/// Outbound half of a link.
pub(crate) type LinkWriter = mpsc::UnboundedSender<String>;

/// Inbound half of a link.
pub(crate) type LinkReader = mpsc::UnboundedReceiver<String>;

// ============================================================================
// Link
// ============================================================================

/// One established physical connection.
#[derive(Debug)]
pub struct Link {
    writer: LinkWriter,
    reader: LinkReader,
}

impl Link {
    /// Creates a link from its channel halves.
    ///
    /// `writer` carries raw text to the peer; `reader` yields raw chunks from
    /// the peer and ends when the connection closes.
    #[inline]
    #[must_use]
    pub fn new(writer: mpsc::UnboundedSender<String>, reader: mpsc::UnboundedReceiver<String>) -> Self {
        Self { writer, reader }
    }

    /// Splits the link into its halves.
    #[inline]
    pub(crate) fn into_parts(self) -> (LinkWriter, LinkReader) {
        (self.writer, self.reader)
    }
}

// ============================================================================
// Connector
// ============================================================================

/// Opens physical connections to an address.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Attempts one physical connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] or [`Error::InvalidAddress`] when the
    /// attempt fails; the transport schedules a retry.
    async fn open(&self, address: &str) -> Result<Link>;
}

#[async_trait]
impl<C: Connector + ?Sized> Connector for Arc<C> {
    async fn open(&self, address: &str) -> Result<Link> {
        (**self).open(address).await
    }
}

/// Picks a connector from the address scheme.
///
/// | Scheme | Connector |
/// |--------|-----------|
/// | `ws`, `wss` | [`WebSocketConnector`] |
/// | `tcp` | [`TcpConnector`] |
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] for unparseable addresses and other
/// schemes.
pub fn connector_for(address: &str) -> Result<Arc<dyn Connector>> {
    let url = Url::parse(address).map_err(|e| Error::invalid_address(address, e.to_string()))?;

    match url.scheme() {
        "ws" | "wss" => Ok(Arc::new(WebSocketConnector)),
        "tcp" => Ok(Arc::new(TcpConnector)),
        other => Err(Error::invalid_address(
            address,
            format!("unsupported scheme '{other}'"),
        )),
    }
}

// ============================================================================
// AuthHandle
// ============================================================================

/// Handle passed to the authentication hook.
///
/// Allows exactly one raw send on the link that just connected.
#[derive(Debug)]
pub struct AuthHandle {
    writer: LinkWriter,
}

impl AuthHandle {
    pub(crate) fn new(writer: LinkWriter) -> Self {
        Self { writer }
    }

    /// Sends raw text, consuming the handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the link already went away.
    pub fn send(self, payload: impl Into<String>) -> Result<()> {
        self.writer
            .send(payload.into())
            .map_err(|_| Error::ConnectionClosed)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connector_for_known_schemes() {
        assert!(connector_for("ws://localhost:9873/").is_ok());
        assert!(connector_for("wss://example.com/socket").is_ok());
        assert!(connector_for("tcp://localhost:9872").is_ok());
    }

    #[test]
    fn test_connector_for_rejects_unknown_scheme() {
        let err = connector_for("http://localhost/").err().expect("should fail");
        assert!(matches!(err, Error::InvalidAddress { .. }));
        assert!(err.to_string().contains("http"));
    }

    #[test]
    fn test_connector_for_rejects_garbage() {
        assert!(connector_for("not an address").is_err());
    }

    #[test]
    fn test_auth_handle_sends_once() {
        let (writer, mut reader) = mpsc::unbounded_channel();
        let handle = AuthHandle::new(writer);
        handle.send("token").expect("send");
        assert_eq!(reader.try_recv().ok().as_deref(), Some("token"));
    }

    #[test]
    fn test_auth_handle_closed_link() {
        let (writer, reader) = mpsc::unbounded_channel::<String>();
        drop(reader);
        let result = AuthHandle::new(writer).send("token");
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }
}
