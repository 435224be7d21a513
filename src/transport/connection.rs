//! Reconnecting transport and its event loop.
//!
//! A [`Transport`] maintains exactly one logical connection to a fixed
//! address, transparently replacing the physical link after every
//! disconnect.
//!
//! # Event Loop
//!
//! The transport spawns a tokio task that owns all lifecycle state and
//! handles:
//!
//! - Commands from the API (connect, handler install, shutdown)
//! - The in-flight connection attempt
//! - Raw chunks and close events from the current link
//! - The retry timer
//!
//! Callbacks are dispatched from that task only, so the layers above see
//! lifecycle events and messages in wire order without locking.
//!
//! # State Machine
//!
//! ```text
//!                 connect() / retry fires
//!  Disconnected ───────────────────────────► Connecting
//!       ▲  ▲                                   │    │
//!       │  └──────── attempt fails ────────────┘    │ attempt succeeds
//!       │            (schedule retry)               ▼
//!       └──────────── link closes ─────────────── Connected
//!                     (schedule retry)
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Sleep, sleep, timeout};
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::handler::Handler;
use crate::identifiers::ConnectionId;

use super::config::TransportConfig;
use super::link::{AuthHandle, Connector, Link, LinkReader, LinkWriter};

// ============================================================================
// Types
// ============================================================================

/// Boxed handler installed by the layer above.
type BoxHandler = Box<dyn Handler<String>>;

/// Writer of the current link, `Some` exactly while connected.
type WriterSlot = Arc<Mutex<Option<LinkWriter>>>;

/// Set once teardown is requested; never cleared.
type ShutdownFlag = Arc<AtomicBool>;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No link and no attempt in flight.
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// A link is established.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(name)
    }
}

// ============================================================================
// TransportCommand
// ============================================================================

/// Internal commands for the event loop.
enum TransportCommand {
    /// Start a connection attempt unless one is in flight or established.
    Connect,
    /// Install the handler for lifecycle callbacks.
    SetHandler(BoxHandler),
    /// Tear down and acknowledge once no further callback can fire.
    Shutdown(Option<oneshot::Sender<()>>),
}

// ============================================================================
// Sender
// ============================================================================

/// Send-only handle to a transport.
///
/// Cheap to clone; layers above keep one to send from inside callbacks.
/// Holding a `Sender` does not keep the event loop alive.
#[derive(Clone)]
pub struct Sender {
    writer: WriterSlot,
    shut_down: ShutdownFlag,
}

impl Sender {
    /// Sends a raw payload on the current link.
    ///
    /// Nothing is buffered: a payload sent while disconnected is dropped.
    ///
    /// # Errors
    ///
    /// - [`Error::Shutdown`] once the transport has been torn down
    /// - [`Error::NotConnected`] if no link is established
    /// - [`Error::ConnectionClosed`] if the link closed underneath the send
    pub fn send(&self, payload: impl Into<String>) -> Result<()> {
        let payload = payload.into();

        if self.is_shut_down() {
            warn!(len = payload.len(), "Send after shutdown, payload dropped");
            return Err(Error::Shutdown);
        }

        let guard = self.writer.lock();

        let Some(writer) = guard.as_ref() else {
            warn!(len = payload.len(), "Send while disconnected, payload dropped");
            return Err(Error::NotConnected);
        };

        writer.send(payload).map_err(|e| {
            warn!(len = e.0.len(), "Link closed during send, payload dropped");
            Error::ConnectionClosed
        })
    }

    /// Returns `true` while a link is established.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.writer.lock().is_some()
    }

    /// Returns `true` once teardown has been requested.
    #[inline]
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("connected", &self.is_connected())
            .finish()
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Reconnecting raw transport.
///
/// Delivers raw chunks to a [`Handler<String>`] and forwards raw text to the
/// current link. Retries indefinitely after any disconnect until closed.
///
/// # Example
///
/// ```ignore
/// let transport = Transport::new(TransportConfig::new("ws://localhost:9873/"), WebSocketConnector)?;
/// transport.set_handler(Callbacks::new().on_message(|chunk: String| print!("{chunk}")));
/// transport.connect();
/// ```
pub struct Transport {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<TransportCommand>,
    /// Send path shared with the event loop.
    sender: Sender,
}

impl Transport {
    /// Creates a transport in the `Disconnected` state.
    ///
    /// Spawns the event loop task internally, so it must be called from
    /// within a Tokio runtime. No connection is attempted until
    /// [`connect`](Self::connect).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration fails
    /// [`TransportConfig::validate`].
    pub fn new(config: TransportConfig, connector: impl Connector) -> Result<Self> {
        config.validate()?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let writer: WriterSlot = Arc::new(Mutex::new(None));
        let shut_down: ShutdownFlag = Arc::new(AtomicBool::new(false));

        let event_loop = EventLoop {
            config,
            connector: Arc::new(connector),
            handler: None,
            writer: Arc::clone(&writer),
            shut_down: Arc::clone(&shut_down),
            state: ConnectionState::Disconnected,
            connection_id: None,
            pending: None,
            reader: None,
            retry: None,
        };

        tokio::spawn(event_loop.run(command_rx));

        Ok(Self {
            command_tx,
            sender: Sender { writer, shut_down },
        })
    }

    /// Installs the handler receiving lifecycle callbacks and raw chunks.
    ///
    /// Replaces any previous handler. Commands are processed in order, so a
    /// handler installed before [`connect`](Self::connect) sees the first
    /// `connected` event.
    pub fn set_handler(&self, handler: impl Handler<String>) {
        self.command(TransportCommand::SetHandler(Box::new(handler)));
    }

    /// Requests a connection.
    ///
    /// Idempotent: ignored while connecting or connected. A pending retry
    /// timer is superseded by the immediate attempt. Ignored with a warning
    /// after teardown.
    pub fn connect(&self) {
        if self.sender.is_shut_down() {
            warn!("Connect after shutdown ignored");
            return;
        }
        self.command(TransportCommand::Connect);
    }

    /// Sends a raw payload. See [`Sender::send`].
    ///
    /// # Errors
    ///
    /// - [`Error::Shutdown`] once the transport has been torn down
    /// - [`Error::NotConnected`] if no link is established
    /// - [`Error::ConnectionClosed`] if the link closed underneath the send
    #[inline]
    pub fn send(&self, payload: impl Into<String>) -> Result<()> {
        self.sender.send(payload)
    }

    /// Returns a send-only handle.
    #[inline]
    #[must_use]
    pub fn sender(&self) -> Sender {
        self.sender.clone()
    }

    /// Returns `true` while a link is established.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.sender.is_connected()
    }

    /// Tears the transport down and waits for the event loop to stop.
    ///
    /// Cancels any pending retry, releases the link and drops the handler.
    /// No callback fires after this returns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the event loop died without
    /// acknowledging.
    pub async fn close(&self) -> Result<()> {
        self.sender.shut_down.store(true, Ordering::Release);
        let (ack_tx, ack_rx) = oneshot::channel();

        if self
            .command_tx
            .send(TransportCommand::Shutdown(Some(ack_tx)))
            .is_err()
        {
            trace!("Transport already shut down");
            return Ok(());
        }

        ack_rx.await?;
        Ok(())
    }

    /// Requests teardown without waiting for it.
    pub fn shutdown(&self) {
        self.sender.shut_down.store(true, Ordering::Release);
        let _ = self.command_tx.send(TransportCommand::Shutdown(None));
    }

    fn command(&self, command: TransportCommand) {
        if self.command_tx.send(command).is_err() {
            debug!("Command ignored, transport is shut down");
        }
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// EventLoop
// ============================================================================

/// Lifecycle state owned by the event loop task.
struct EventLoop {
    config: TransportConfig,
    connector: Arc<dyn Connector>,
    handler: Option<BoxHandler>,
    writer: WriterSlot,
    shut_down: ShutdownFlag,
    state: ConnectionState,
    connection_id: Option<ConnectionId>,
    /// In-flight connection attempt.
    pending: Option<BoxFuture<'static, Result<Link>>>,
    /// Inbound half of the current link.
    reader: Option<LinkReader>,
    /// At most one scheduled reconnection.
    retry: Option<Pin<Box<Sleep>>>,
}

impl EventLoop {
    async fn run(mut self, mut command_rx: mpsc::UnboundedReceiver<TransportCommand>) {
        loop {
            tokio::select! {
                command = command_rx.recv() => {
                    match command {
                        Some(TransportCommand::Connect) => self.start_attempt(),

                        Some(TransportCommand::SetHandler(handler)) => {
                            self.handler = Some(handler);
                        }

                        Some(TransportCommand::Shutdown(ack)) => {
                            self.teardown();
                            if let Some(ack) = ack {
                                let _ = ack.send(());
                            }
                            break;
                        }

                        None => {
                            debug!("Transport dropped");
                            self.teardown();
                            break;
                        }
                    }
                }

                result = attempt(&mut self.pending), if self.pending.is_some() => {
                    self.pending = None;
                    match result {
                        Ok(link) => self.on_open(link),
                        Err(e) => self.on_attempt_failed(&e),
                    }
                }

                chunk = next_chunk(&mut self.reader), if self.reader.is_some() => {
                    match chunk {
                        Some(chunk) => self.on_chunk(chunk),
                        None => self.on_close(),
                    }
                }

                () = retry_elapsed(&mut self.retry), if self.retry.is_some() => {
                    self.retry = None;
                    trace!("Retry timer fired");
                    self.start_attempt();
                }
            }
        }

        debug!("Transport event loop terminated");
    }

    fn start_attempt(&mut self) {
        if self.state != ConnectionState::Disconnected {
            trace!(state = %self.state, "Connect ignored");
            return;
        }

        self.retry = None;
        self.state = ConnectionState::Connecting;

        let connector = Arc::clone(&self.connector);
        let address = self.config.address().to_owned();
        let limit = self.config.connect_timeout();
        debug!(address = %address, "Connection attempt");

        self.pending = Some(Box::pin(async move {
            timeout(limit, connector.open(&address))
                .await
                .unwrap_or_else(|_| Err(Error::connection_timeout(limit.as_millis() as u64)))
        }));
    }

    fn on_open(&mut self, link: Link) {
        let (writer, reader) = link.into_parts();
        let connection_id = ConnectionId::generate();

        *self.writer.lock() = Some(writer.clone());
        self.reader = Some(reader);
        self.connection_id = Some(connection_id);
        self.state = ConnectionState::Connected;
        self.retry = None;

        info!(%connection_id, address = self.config.address(), "Connected");

        if let Some(handler) = self.handler.as_mut() {
            handler.connected();
        }

        if let Some(authenticate) = self.config.authenticate() {
            trace!(%connection_id, "Running authentication hook");
            authenticate(AuthHandle::new(writer));
        }
    }

    fn on_attempt_failed(&mut self, error: &Error) {
        self.state = ConnectionState::Disconnected;

        if error.is_recoverable() {
            warn!(error = %error, address = self.config.address(), "Connection attempt failed");
        } else {
            error!(
                error = %error,
                address = self.config.address(),
                "Connection attempt failed, retrying will not help until the cause is fixed"
            );
        }

        if let Some(handler) = self.handler.as_mut() {
            handler.disconnected();
        }

        self.schedule_retry();
    }

    fn on_chunk(&mut self, chunk: String) {
        trace!(len = chunk.len(), "Chunk received");

        if let Some(handler) = self.handler.as_mut() {
            handler.message(chunk);
        }
    }

    fn on_close(&mut self) {
        self.release_link();
        self.state = ConnectionState::Disconnected;

        if let Some(handler) = self.handler.as_mut() {
            handler.disconnected();
        }

        self.schedule_retry();
    }

    fn schedule_retry(&mut self) {
        if self.retry.is_some() {
            return;
        }

        let interval = self.config.retry_interval();
        debug!(retry_secs = interval.as_secs_f64(), "Reconnection scheduled");
        self.retry = Some(Box::pin(sleep(interval)));
    }

    fn release_link(&mut self) {
        *self.writer.lock() = None;
        self.reader = None;

        if let Some(connection_id) = self.connection_id.take() {
            info!(%connection_id, "Disconnected");
        }
    }

    fn teardown(&mut self) {
        self.shut_down.store(true, Ordering::Release);
        self.retry = None;
        self.pending = None;
        self.release_link();
        self.handler = None;
        self.state = ConnectionState::Disconnected;
        debug!("Transport shut down");
    }
}

// ============================================================================
// Select Helpers
// ============================================================================

async fn attempt(pending: &mut Option<BoxFuture<'static, Result<Link>>>) -> Result<Link> {
    match pending.as_mut() {
        Some(fut) => fut.await,
        None => future::pending().await,
    }
}

async fn next_chunk(reader: &mut Option<LinkReader>) -> Option<String> {
    match reader.as_mut() {
        Some(reader) => reader.recv().await,
        None => future::pending().await,
    }
}

async fn retry_elapsed(retry: &mut Option<Pin<Box<Sleep>>>) {
    match retry.as_mut() {
        Some(timer) => timer.as_mut().await,
        None => future::pending().await,
    }
}

// ============================================================================
// Tests
// ============================================================================
