//! Message-level transport built on [`LineCodec`].
//!
//! [`FramedTransport`] wraps a [`Transport`] and speaks whole messages:
//! outgoing values are encoded before the raw send, incoming chunks are
//! reassembled and decoded before they reach the handler. Lifecycle
//! callbacks pass straight through.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::error::Result;
use crate::handler::Handler;
use crate::transport::{Sender, Transport};

use super::line::LineCodec;

// ============================================================================
// FramedTransport
// ============================================================================

/// Reconnecting transport that exchanges framed messages of type `M`.
///
/// # Example
///
/// ```ignore
/// let framed = FramedTransport::<Value>::new(transport);
/// framed.set_handler(Callbacks::new().on_message(|value| println!("{value}")));
/// framed.connect();
/// framed.send(&json!({"hello": "world"}))?;
/// ```
pub struct FramedTransport<M> {
    transport: Transport,
    _message: PhantomData<fn(M) -> M>,
}

impl<M> FramedTransport<M>
where
    M: Serialize + DeserializeOwned + Send + 'static,
{
    /// Wraps a raw transport.
    #[must_use]
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            _message: PhantomData,
        }
    }

    /// Installs the handler receiving decoded messages.
    pub fn set_handler(&self, handler: impl Handler<M>) {
        self.transport.set_handler(Deframer::new(handler));
    }

    /// Requests a connection. See [`Transport::connect`].
    #[inline]
    pub fn connect(&self) {
        self.transport.connect();
    }

    /// Encodes and sends one message.
    ///
    /// # Errors
    ///
    /// - [`Error::EmbeddedDelimiter`](crate::Error::EmbeddedDelimiter) or
    ///   [`Error::Json`](crate::Error::Json) if encoding fails
    /// - [`Error::Shutdown`](crate::Error::Shutdown) after teardown
    /// - [`Error::NotConnected`](crate::Error::NotConnected) if no link is established
    #[inline]
    pub fn send(&self, message: &M) -> Result<()> {
        self.transport.send(LineCodec::encode(message)?)
    }

    /// Returns a send-only handle for use inside callbacks.
    #[inline]
    #[must_use]
    pub fn sender(&self) -> FrameSender<M> {
        FrameSender::new(self.transport.sender())
    }

    /// Returns `true` while a link is established.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Tears down the underlying transport. See [`Transport::close`].
    ///
    /// # Errors
    ///
    /// See [`Transport::close`].
    pub async fn close(&self) -> Result<()> {
        self.transport.close().await
    }

    /// Requests teardown without waiting for it.
    #[inline]
    pub fn shutdown(&self) {
        self.transport.shutdown();
    }
}

impl<M> fmt::Debug for FramedTransport<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramedTransport")
            .field("transport", &self.transport)
            .finish()
    }
}

// ============================================================================
// FrameSender
// ============================================================================

/// Send-only handle that encodes before sending.
pub struct FrameSender<M> {
    sender: Sender,
    _message: PhantomData<fn(M)>,
}

impl<M> Clone for FrameSender<M> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            _message: PhantomData,
        }
    }
}

impl<M> fmt::Debug for FrameSender<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSender")
            .field("sender", &self.sender)
            .finish()
    }
}

impl<M: Serialize> FrameSender<M> {
    pub(crate) fn new(sender: Sender) -> Self {
        Self {
            sender,
            _message: PhantomData,
        }
    }

    /// Encodes and sends one message.
    ///
    /// # Errors
    ///
    /// See [`FramedTransport::send`].
    pub fn send(&self, message: &M) -> Result<()> {
        self.sender.send(LineCodec::encode(message)?)
    }

    /// Returns `true` while a link is established.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.sender.is_connected()
    }
}

// ============================================================================
// Deframer
// ============================================================================

/// Raw-chunk handler that decodes into `H`.
struct Deframer<M, H> {
    codec: LineCodec<M>,
    inner: H,
}

impl<M, H> Deframer<M, H> {
    fn new(inner: H) -> Self {
        Self {
            codec: LineCodec::new(),
            inner,
        }
    }
}

impl<M, H> Handler<String> for Deframer<M, H>
where
    M: DeserializeOwned + Send + 'static,
    H: Handler<M>,
{
    fn connected(&mut self) {
        self.codec.reset();
        self.inner.connected();
    }

    fn disconnected(&mut self) {
        if self.codec.buffered() > 0 {
            trace!(len = self.codec.buffered(), "Discarding partial frame");
        }
        self.codec.reset();
        self.inner.disconnected();
    }

    fn message(&mut self, chunk: String) {
        for message in self.codec.decode(&chunk) {
            self.inner.message(message);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde::Deserialize;
    use tokio::sync::mpsc;

    use crate::error::Error;
    use crate::handler::Notification;
    use crate::transport::{MemoryConnector, MemoryListener, TransportConfig};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Tick {
        seq: u32,
    }

    type Events = mpsc::UnboundedReceiver<Notification<Tick>>;

    fn setup() -> (FramedTransport<Tick>, MemoryListener, Events) {
        let (connector, listener) = MemoryConnector::new();
        let transport = Transport::new(TransportConfig::new("memory://framed"), connector)
            .expect("valid config");
        let framed = FramedTransport::new(transport);
        let (tx, rx) = mpsc::unbounded_channel();
        framed.set_handler(tx);
        (framed, listener, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_encodes_one_line() {
        let (framed, mut listener, mut events) = setup();
        framed.connect();
        let mut peer = listener.accept().await.expect("accepted");
        assert_eq!(events.recv().await, Some(Notification::Connected));

        framed.send(&Tick { seq: 1 }).expect("send");
        framed.sender().send(&Tick { seq: 2 }).expect("send");

        assert_eq!(peer.recv().await.as_deref(), Some("{\"seq\":1}\n"));
        assert_eq!(peer.recv().await.as_deref(), Some("{\"seq\":2}\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reassembles_split_chunks() {
        let (framed, mut listener, mut events) = setup();
        framed.connect();
        let peer = listener.accept().await.expect("accepted");
        assert_eq!(events.recv().await, Some(Notification::Connected));

        peer.send("{\"seq\":1}\n{\"se").expect("send");
        peer.send("q\":2}\n\n{\"seq\":3}\n").expect("send");

        for seq in 1..=3 {
            assert_eq!(
                events.recv().await,
                Some(Notification::Message(Tick { seq }))
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_frame_is_skipped() {
        let (framed, mut listener, mut events) = setup();
        framed.connect();
        let peer = listener.accept().await.expect("accepted");
        assert_eq!(events.recv().await, Some(Notification::Connected));

        peer.send("{\"seq\":1}\n{\"other\":true}\n{\"seq\":2}\n")
            .expect("send");

        assert_eq!(
            events.recv().await,
            Some(Notification::Message(Tick { seq: 1 }))
        );
        assert_eq!(
            events.recv().await,
            Some(Notification::Message(Tick { seq: 2 }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_frame_discarded_on_reconnect() {
        let (framed, mut listener, mut events) = setup();
        framed.connect();

        let peer = listener.accept().await.expect("accepted");
        assert_eq!(events.recv().await, Some(Notification::Connected));
        peer.send("{\"seq\":").expect("send");
        peer.close();
        assert_eq!(events.recv().await, Some(Notification::Disconnected));

        tokio::time::advance(crate::transport::DEFAULT_RETRY_INTERVAL).await;
        let peer = listener.accept().await.expect("reaccepted");
        assert_eq!(events.recv().await, Some(Notification::Connected));

        peer.send("{\"seq\":9}\n").expect("send");
        assert_eq!(
            events.recv().await,
            Some(Notification::Message(Tick { seq: 9 }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_while_disconnected() {
        let (framed, _listener, _events) = setup();
        let result = framed.send(&Tick { seq: 1 });
        assert!(matches!(result, Err(Error::NotConnected)));
        assert!(!framed.sender().is_connected());
    }
}
