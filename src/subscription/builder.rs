//! Builder pattern for subscription clients.
//!
//! Assembles connector, [`Transport`], framing and the subscription layer
//! in one call.
//!
//! # Example
//!
//! ```ignore
//! let client = SubscriptionClient::builder()
//!     .address("tcp://localhost:9872")
//!     .retry_interval_secs(2)
//!     .authenticate(|handle| {
//!         let _ = handle.send("secret\n");
//!     })
//!     .build(handler)?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::handler::Handler;
use crate::transport::{
    AuthHandle, AuthHook, Connector, Transport, TransportConfig, connector_for,
};

use super::client::SubscriptionClient;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for a [`SubscriptionClient`].
///
/// Use [`SubscriptionClient::builder()`] to create one.
#[derive(Default, Clone)]
pub struct ClientBuilder {
    /// Target address.
    address: Option<String>,
    /// Retry interval override.
    retry_interval: Option<Duration>,
    /// Connection attempt limit override.
    connect_timeout: Option<Duration>,
    /// Authentication hook.
    authenticate: Option<AuthHook>,
    /// Topics declared on first connect.
    subscriptions: Vec<String>,
    /// Connector override; chosen from the address scheme otherwise.
    connector: Option<Arc<dyn Connector>>,
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates an empty builder.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the target address (`ws://`, `wss://` or `tcp://`).
    #[inline]
    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Sets the delay between reconnection attempts.
    #[inline]
    #[must_use]
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = Some(interval);
        self
    }

    /// Sets the delay between reconnection attempts in whole seconds.
    #[inline]
    #[must_use]
    pub fn retry_interval_secs(self, secs: u64) -> Self {
        self.retry_interval(Duration::from_secs(secs))
    }

    /// Sets the limit on a single connection attempt.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the authentication hook run after every connect.
    #[inline]
    #[must_use]
    pub fn authenticate(mut self, hook: impl Fn(AuthHandle) + Send + Sync + 'static) -> Self {
        self.authenticate = Some(Arc::new(hook));
        self
    }

    /// Sets the topics declared on first connect.
    #[must_use]
    pub fn subscriptions<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subscriptions = topics.into_iter().map(Into::into).collect();
        self
    }

    /// Uses `connector` instead of picking one from the address scheme.
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Builds the client with validation. No connection is attempted yet.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the address is missing or the config is invalid
    /// - [`Error::InvalidAddress`] if no connector handles the address scheme
    pub fn build(self, handler: impl Handler<Value>) -> Result<SubscriptionClient> {
        let config = self.validate_config()?;

        let connector = match self.connector {
            Some(connector) => connector,
            None => connector_for(config.address())?,
        };

        let transport = Transport::new(config, connector)?;
        Ok(SubscriptionClient::with_subscriptions(
            transport,
            self.subscriptions,
            handler,
        ))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    fn validate_config(&self) -> Result<TransportConfig> {
        let address = self.address.clone().ok_or_else(|| {
            Error::config(
                "Address is required. Use .address() to set it.\n\
                 Example: SubscriptionClient::builder().address(\"ws://localhost:9873/\")",
            )
        })?;

        let mut config = TransportConfig::new(address);

        if let Some(interval) = self.retry_interval {
            config = config.with_retry_interval(interval);
        }

        if let Some(timeout) = self.connect_timeout {
            config = config.with_connect_timeout(timeout);
        }

        if let Some(hook) = self.authenticate.clone() {
            config = config.with_authenticate(move |handle| hook(handle));
        }

        config.validate()?;
        Ok(config)
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("address", &self.address)
            .field("retry_interval", &self.retry_interval)
            .field("connect_timeout", &self.connect_timeout)
            .field("authenticate", &self.authenticate.is_some())
            .field("subscriptions", &self.subscriptions)
            .field("connector", &self.connector.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::sync::mpsc;

    use crate::handler::Notification;
    use crate::transport::MemoryConnector;

    fn handler() -> mpsc::UnboundedSender<Notification<Value>> {
        mpsc::unbounded_channel().0
    }

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = ClientBuilder::new();
        assert!(builder.address.is_none());
        assert!(builder.retry_interval.is_none());
        assert!(builder.subscriptions.is_empty());
    }

    #[test]
    fn test_setters() {
        let builder = ClientBuilder::new()
            .address("ws://localhost:9873/")
            .retry_interval_secs(2)
            .subscriptions(["a", "b"]);

        assert_eq!(builder.address.as_deref(), Some("ws://localhost:9873/"));
        assert_eq!(builder.retry_interval, Some(Duration::from_secs(2)));
        assert_eq!(builder.subscriptions, vec!["a", "b"]);
    }

    #[test]
    fn test_validate_applies_connect_timeout() {
        let config = ClientBuilder::new()
            .address("ws://localhost:9873/")
            .connect_timeout(Duration::from_secs(3))
            .validate_config()
            .expect("valid");
        assert_eq!(config.connect_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_validate_keeps_hook() {
        let config = ClientBuilder::new()
            .address("ws://localhost:9873/")
            .authenticate(|_| {})
            .validate_config()
            .expect("valid");
        assert!(config.authenticate().is_some());
    }

    #[tokio::test]
    async fn test_build_fails_without_address() {
        let err = ClientBuilder::new().build(handler()).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("Address"));
    }

    #[tokio::test]
    async fn test_build_fails_with_zero_interval() {
        let result = ClientBuilder::new()
            .address("ws://localhost:9873/")
            .retry_interval(Duration::ZERO)
            .build(handler());
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_build_fails_with_unknown_scheme() {
        let result = ClientBuilder::new()
            .address("http://localhost:9873/")
            .build(handler());
        assert!(matches!(result, Err(Error::InvalidAddress { .. })));
    }

    #[tokio::test]
    async fn test_build_with_connector_override() {
        let (connector, mut listener) = MemoryConnector::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let client = SubscriptionClient::builder()
            .address("memory://override")
            .subscriptions(["t"])
            .connector(connector)
            .build(tx)
            .expect("build");
        assert_eq!(client.subscriptions(), vec!["t"]);

        client.connect();
        let mut peer = listener.accept().await.expect("accepted");
        assert_eq!(rx.recv().await, Some(Notification::Connected));
        assert_eq!(
            peer.recv().await.as_deref(),
            Some("{\"action\":\"subscribe\",\"data\":[\"t\"]}\n")
        );
    }

    #[test]
    fn test_builder_is_clone() {
        let builder = ClientBuilder::new().address("tcp://localhost:9872");
        let cloned = builder.clone();
        assert_eq!(builder.address, cloned.address);
    }
}
