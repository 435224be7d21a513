//! Reconnecting transport layer.
//!
//! This module owns the physical connection: opening it, noticing when it
//! goes away and replacing it after the configured retry interval.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   commands    ┌──────────────────────┐
//! │  Transport (handle)  │──────────────►│  EventLoop (task)    │
//! │  Sender (send path)  │               │  state, retry timer  │
//! └──────────┬───────────┘               └──────────┬───────────┘
//!            │ raw text                             │ open / chunks / close
//!            ▼                                      ▼
//!      ┌───────────────────────────────────────────────────┐
//!      │  Link  (Connector: WebSocket | TCP | Memory)      │
//!      └───────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `config` | Immutable transport configuration |
//! | `connection` | Transport handle and event loop |
//! | `link` | Physical link and connector abstraction |
//! | `memory` | In-process connector |
//! | `tcp` | Plain TCP connector |
//! | `websocket` | WebSocket connector |

// ============================================================================
// Submodules
// ============================================================================

/// Transport configuration.
pub mod config;

/// Transport handle and event loop.
pub mod connection;

/// Physical link and connector abstraction.
pub mod link;

/// In-process connector.
pub mod memory;

/// Plain TCP connector.
pub mod tcp;

/// WebSocket connector.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{AuthHook, DEFAULT_CONNECT_TIMEOUT, DEFAULT_RETRY_INTERVAL, TransportConfig};
pub use connection::{ConnectionState, Sender, Transport};
pub use link::{AuthHandle, Connector, Link, connector_for};
pub use memory::{MemoryConnector, MemoryListener, MemoryPeer};
pub use tcp::TcpConnector;
pub use websocket::WebSocketConnector;
