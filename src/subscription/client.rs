//! Subscription client.
//!
//! [`SubscriptionClient`] layers the [`Envelope`] protocol on a
//! [`FramedTransport`]. It keeps the caller's topic list and re-declares it
//! after every (re)connection, before the application sees `connected`.
//!
//! # Example
//!
//! ```ignore
//! let client = SubscriptionClient::builder()
//!     .address("ws://localhost:9873/")
//!     .subscriptions(["prices"])
//!     .build(Callbacks::new().on_message(|value| println!("{value}")))?;
//!
//! client.connect();
//! client.update_subscriptions(["prices", "trades"])?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, trace};

use crate::codec::{FrameSender, FramedTransport};
use crate::error::Result;
use crate::handler::Handler;
use crate::protocol::Envelope;
use crate::transport::Transport;

use super::builder::ClientBuilder;

// ============================================================================
// Shared State
// ============================================================================

/// Topic list and link status, guarded together.
///
/// Holding both under one lock makes `update_subscriptions` and the
/// `connected` callback agree on which of them sends the `subscribe`.
#[derive(Debug, Default)]
struct SubscriptionState {
    topics: Vec<String>,
    connected: bool,
}

type SharedState = Arc<Mutex<SubscriptionState>>;

// ============================================================================
// SubscriptionClient
// ============================================================================

/// Reconnecting publish/subscribe client.
///
/// The application handler receives `connected`, `disconnected` and one
/// `message` per value carried by an incoming `message` envelope.
pub struct SubscriptionClient {
    framed: FramedTransport<Envelope>,
    state: SharedState,
}

impl SubscriptionClient {
    /// Creates a client over `transport` with no subscriptions.
    pub fn new(transport: Transport, handler: impl Handler<Value>) -> Self {
        Self::with_subscriptions(transport, Vec::<String>::new(), handler)
    }

    /// Creates a client that declares `topics` on first connect.
    pub fn with_subscriptions<I, S>(
        transport: Transport,
        topics: I,
        handler: impl Handler<Value>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let framed = FramedTransport::new(transport);
        let state: SharedState = Arc::new(Mutex::new(SubscriptionState {
            topics: topics.into_iter().map(Into::into).collect(),
            connected: false,
        }));

        framed.set_handler(Demux {
            state: Arc::clone(&state),
            sender: framed.sender(),
            inner: handler,
        });

        Self { framed, state }
    }

    /// Creates a builder that assembles the whole stack.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Requests a connection. See [`Transport::connect`].
    #[inline]
    pub fn connect(&self) {
        self.framed.connect();
    }

    /// Replaces the subscription set.
    ///
    /// Sends a `subscribe` envelope right away when connected; otherwise the
    /// new set goes out on the next connection. A link lost mid-send is not
    /// an error since the set is replayed on reconnect.
    ///
    /// # Errors
    ///
    /// Returns an encoding error if the envelope cannot be framed.
    pub fn update_subscriptions<I, S>(&self, topics: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let topics: Vec<String> = topics.into_iter().map(Into::into).collect();
        let mut state = self.state.lock();
        state.topics = topics;

        if !state.connected {
            debug!(
                topics = state.topics.len(),
                "Subscriptions updated while disconnected, deferred to next connect"
            );
            return Ok(());
        }

        match self.framed.send(&Envelope::subscribe(state.topics.clone())) {
            Ok(()) => Ok(()),
            Err(e) if e.is_connection_error() => {
                debug!(error = %e, "Subscribe not delivered, will replay on reconnect");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Sends `values` as one `message` envelope.
    ///
    /// Nothing is queued while disconnected.
    ///
    /// # Errors
    ///
    /// - [`Error::Shutdown`](crate::Error::Shutdown) after [`close`](Self::close)
    /// - [`Error::NotConnected`](crate::Error::NotConnected) if no link is established
    /// - [`Error::ConnectionClosed`](crate::Error::ConnectionClosed) if the link closed during the send
    pub fn send_messages<I>(&self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = Value>,
    {
        let envelope = Envelope::message(values.into_iter().collect());
        self.framed.send(&envelope)
    }

    /// Returns a snapshot of the current subscription set.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        self.state.lock().topics.clone()
    }

    /// Returns `true` while a link is established.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.framed.is_connected()
    }

    /// Tears the stack down. No callback fires after this returns.
    ///
    /// # Errors
    ///
    /// See [`Transport::close`].
    pub async fn close(&self) -> Result<()> {
        self.framed.close().await
    }

    /// Requests teardown without waiting for it.
    #[inline]
    pub fn shutdown(&self) {
        self.framed.shutdown();
    }
}

impl fmt::Debug for SubscriptionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionClient")
            .field("subscriptions", &self.state.lock().topics)
            .field("framed", &self.framed)
            .finish()
    }
}

// ============================================================================
// Demux
// ============================================================================

/// Envelope handler sitting between the framed transport and the application.
struct Demux<H> {
    state: SharedState,
    sender: FrameSender<Envelope>,
    inner: H,
}

impl<H: Handler<Value>> Handler<Envelope> for Demux<H> {
    fn connected(&mut self) {
        {
            let mut state = self.state.lock();
            state.connected = true;

            if !state.topics.is_empty() {
                trace!(topics = ?state.topics, "Declaring subscriptions");
                if let Err(e) = self.sender.send(&Envelope::subscribe(state.topics.clone())) {
                    debug!(error = %e, "Subscribe not delivered on connect");
                }
            }
        }

        self.inner.connected();
    }

    fn disconnected(&mut self) {
        self.state.lock().connected = false;
        self.inner.disconnected();
    }

    fn message(&mut self, envelope: Envelope) {
        trace!(action = envelope.action(), "Envelope received");

        match envelope {
            Envelope::Message(values) => {
                for value in values {
                    self.inner.message(value);
                }
            }

            Envelope::Subscribe(topics) => {
                trace!(topics = topics.len(), "Ignoring subscribe echo");
            }
        }
    }
}

/// Teardown drops the handler without a `disconnected` callback.
impl<H> Drop for Demux<H> {
    fn drop(&mut self) {
        self.state.lock().connected = false;
    }
}

// ============================================================================
// Tests
// ============================================================================
