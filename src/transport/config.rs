//! Transport configuration.
//!
//! [`TransportConfig`] is captured once at construction and never mutated
//! afterwards.
//!
//! # Example
//!
//! ```ignore
//! use socket_reconnect::TransportConfig;
//!
//! let config = TransportConfig::new("ws://localhost:9873/")
//!     .with_retry_interval_secs(2)
//!     .with_authenticate(|handle| {
//!         let _ = handle.send("session-token\n");
//!     });
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

use super::link::AuthHandle;

// ============================================================================
// Constants
// ============================================================================

/// Delay between a disconnect and the next connection attempt.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Limit on a single physical connection attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Types
// ============================================================================

/// Authentication hook.
///
/// Invoked once per successful low-level connect, after the `connected`
/// callback, with a handle good for exactly one raw send.
pub type AuthHook = Arc<dyn Fn(AuthHandle) + Send + Sync>;

// ============================================================================
// TransportConfig
// ============================================================================

/// Immutable transport configuration.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportConfig {
    /// Target address, e.g. `ws://localhost:9873/` or `tcp://localhost:9872`.
    address: String,

    /// Delay before a reconnection attempt.
    #[serde(
        rename = "retryIntervalSeconds",
        default = "default_retry_interval",
        deserialize_with = "deserialize_seconds"
    )]
    retry_interval: Duration,

    /// Limit on one connection attempt; expiry counts as a failed attempt.
    #[serde(
        rename = "connectTimeoutSeconds",
        default = "default_connect_timeout",
        deserialize_with = "deserialize_seconds"
    )]
    connect_timeout: Duration,

    /// Optional hook run after every successful connect.
    #[serde(skip)]
    authenticate: Option<AuthHook>,
}

// ============================================================================
// Constructors
// ============================================================================

impl TransportConfig {
    /// Creates a configuration with default retry interval and no hook.
    #[inline]
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            authenticate: None,
        }
    }

    /// Parses a configuration from JSON.
    ///
    /// Recognized keys: `address` (required), `retryIntervalSeconds` and
    /// `connectTimeoutSeconds` (optional, fractional seconds allowed). The authentication hook can
    /// only be set in code.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the document is not valid
    /// - [`Error::Config`] if validation fails
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl TransportConfig {
    /// Sets the retry interval.
    #[inline]
    #[must_use]
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Sets the retry interval in whole seconds.
    #[inline]
    #[must_use]
    pub fn with_retry_interval_secs(self, secs: u64) -> Self {
        self.with_retry_interval(Duration::from_secs(secs))
    }

    /// Sets the limit on a single connection attempt.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the authentication hook.
    #[inline]
    #[must_use]
    pub fn with_authenticate(mut self, hook: impl Fn(AuthHandle) + Send + Sync + 'static) -> Self {
        self.authenticate = Some(Arc::new(hook));
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl TransportConfig {
    /// Returns the target address.
    #[inline]
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the retry interval.
    #[inline]
    #[must_use]
    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    /// Returns the connection attempt limit.
    #[inline]
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the authentication hook, if any.
    #[inline]
    #[must_use]
    pub fn authenticate(&self) -> Option<&AuthHook> {
        self.authenticate.as_ref()
    }

    /// Checks the configuration for values the transport cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty address, a zero retry interval
    /// or a zero connect timeout.
    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(Error::config("Transport address must not be empty"));
        }

        if self.retry_interval.is_zero() {
            return Err(Error::config("Retry interval must be greater than zero"));
        }

        if self.connect_timeout.is_zero() {
            return Err(Error::config("Connect timeout must be greater than zero"));
        }

        Ok(())
    }
}

impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("address", &self.address)
            .field("retry_interval", &self.retry_interval)
            .field("connect_timeout", &self.connect_timeout)
            .field("authenticate", &self.authenticate.is_some())
            .finish()
    }
}

// ============================================================================
// Serde Helpers
// ============================================================================

fn default_retry_interval() -> Duration {
    DEFAULT_RETRY_INTERVAL
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn deserialize_seconds<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::new("ws://localhost:9873/");
        assert_eq!(config.address(), "ws://localhost:9873/");
        assert_eq!(config.retry_interval(), Duration::from_secs(5));
        assert_eq!(config.connect_timeout(), DEFAULT_CONNECT_TIMEOUT);
        assert!(config.authenticate().is_none());
    }

    #[test]
    fn test_builder_methods() {
        let config = TransportConfig::new("tcp://localhost:9872")
            .with_retry_interval_secs(2)
            .with_authenticate(|_| {});

        assert_eq!(config.retry_interval(), Duration::from_secs(2));
        assert!(config.authenticate().is_some());
    }

    #[test]
    fn test_from_json() {
        let config = TransportConfig::from_json(
            r#"{"address": "ws://example.com:9873/", "retryIntervalSeconds": 0.5}"#,
        )
        .expect("valid config");

        assert_eq!(config.address(), "ws://example.com:9873/");
        assert_eq!(config.retry_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_from_json_default_interval() {
        let config =
            TransportConfig::from_json(r#"{"address": "tcp://localhost:9872"}"#).expect("valid");
        assert_eq!(config.retry_interval(), DEFAULT_RETRY_INTERVAL);
    }

    #[test]
    fn test_from_json_rejects_negative_interval() {
        let result = TransportConfig::from_json(
            r#"{"address": "tcp://localhost:9872", "retryIntervalSeconds": -1}"#,
        );
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_validate_empty_address() {
        let err = TransportConfig::new("  ").validate().unwrap_err();
        assert!(err.to_string().contains("address"));
    }

    #[test]
    fn test_validate_zero_interval() {
        let err = TransportConfig::new("ws://localhost/")
            .with_retry_interval(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_from_json_connect_timeout() {
        let config = TransportConfig::from_json(
            r#"{"address": "ws://localhost/", "connectTimeoutSeconds": 2.5}"#,
        )
        .expect("valid config");
        assert_eq!(config.connect_timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn test_validate_zero_connect_timeout() {
        let err = TransportConfig::new("ws://localhost/")
            .with_connect_timeout(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_debug_hides_hook() {
        let config = TransportConfig::new("ws://localhost/").with_authenticate(|_| {});
        let debug = format!("{config:?}");
        assert!(debug.contains("authenticate: true"));
    }
}
