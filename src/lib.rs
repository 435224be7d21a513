//! Socket Reconnect - resilient streaming connections with subscriptions.
//!
//! This library keeps one logical connection to a fixed address alive,
//! frames JSON messages on top of it and layers a small publish/subscribe
//! protocol that re-declares its topics after every reconnection.
//!
//! # Architecture
//!
//! The stack is built by composition. Each layer wraps the one beneath it
//! and offers the same [`Handler`] interface upward:
//!
//! ```text
//! application ◄── Handler<Value> ──── SubscriptionClient   (Envelope protocol)
//!                                            │
//!                  Handler<Envelope> ── FramedTransport     (LineCodec, '\n')
//!                                            │
//!                  Handler<String> ──── Transport           (reconnect, retry timer)
//!                                            │
//!                                       Connector           (WebSocket | TCP | Memory)
//! ```
//!
//! Key design principles:
//!
//! - Each [`Transport`] owns its link and one event loop task
//! - All callbacks run on that task, in wire order
//! - Nothing is buffered while disconnected; sends fail fast
//! - Subscriptions are re-sent before the application sees `connected`
//!
//! # Quick Start
//!
//! ```no_run
//! use socket_reconnect::{Callbacks, Result, SubscriptionClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = SubscriptionClient::builder()
//!         .address("ws://localhost:9873/")
//!         .subscriptions(["prices"])
//!         .build(
//!             Callbacks::new()
//!                 .on_connected(|| println!("connected"))
//!                 .on_message(|value| println!("{value}")),
//!         )?;
//!
//!     client.connect();
//!     tokio::signal::ctrl_c().await?;
//!     client.close().await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`codec`] | Line framing: [`LineCodec`], [`FramedTransport`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`handler`] | Callback interface: [`Handler`], [`Callbacks`] |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | [`Envelope`] wire type |
//! | [`subscription`] | [`SubscriptionClient`] and its builder |
//! | [`transport`] | Reconnecting [`Transport`] and connectors |

// ============================================================================
// Modules
// ============================================================================

/// Line framing.
///
/// - [`LineCodec`] - newline-delimited JSON encode/decode with reassembly
/// - [`FramedTransport`] - transport exchanging whole messages
pub mod codec;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Callback interface shared by every layer.
pub mod handler;

/// Type-safe identifiers.
pub mod identifiers;

/// Subscription protocol wire types.
pub mod protocol;

/// Publish/subscribe client.
///
/// Use [`SubscriptionClient::builder()`] to assemble the full stack.
pub mod subscription;

/// Reconnecting transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Codec types
pub use codec::{FrameSender, FramedTransport, LineCodec};

// Error types
pub use error::{Error, Result};

// Handler types
pub use handler::{Callbacks, Handler, Notification};

// Identifier types
pub use identifiers::ConnectionId;

// Protocol types
pub use protocol::Envelope;

// Subscription types
pub use subscription::{ClientBuilder, SubscriptionClient};

// Transport types
pub use transport::{
    AuthHandle, ConnectionState, Connector, Sender, TcpConnector, Transport, TransportConfig,
    WebSocketConnector,
};
