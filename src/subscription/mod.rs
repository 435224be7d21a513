//! Publish/subscribe layer.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Fluent construction of the full stack |
//! | `client` | Subscription client and envelope demultiplexing |

/// Fluent construction of the full stack.
pub mod builder;

/// Subscription client.
pub mod client;

pub use builder::ClientBuilder;
pub use client::SubscriptionClient;
