//! Callback interface shared by every layer.
//!
//! Each layer of the stack consumes a [`Handler`] from the layer beneath it
//! and offers the same trait to the layer above, transforming the message
//! type on the way up:
//!
//! | Layer | Delivers |
//! |-------|----------|
//! | [`Transport`](crate::Transport) | `Handler<String>` (raw chunks) |
//! | [`FramedTransport`](crate::FramedTransport) | `Handler<M>` (decoded messages) |
//! | [`SubscriptionClient`](crate::SubscriptionClient) | `Handler<Value>` (envelope data) |
//!
//! Callbacks run on the transport's event loop task, one at a time and in
//! wire order. They must not block.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;

// ============================================================================
// Handler
// ============================================================================

/// Lifecycle and message callbacks delivered by a layer.
pub trait Handler<M>: Send + 'static {
    /// A link was established.
    fn connected(&mut self) {}

    /// The link was lost or a connection attempt failed.
    fn disconnected(&mut self) {}

    /// A message arrived.
    fn message(&mut self, message: M);
}

// ============================================================================
// Callbacks
// ============================================================================

type LifecycleFn = Box<dyn FnMut() + Send>;
type MessageFn<M> = Box<dyn FnMut(M) + Send>;

/// Closure-based [`Handler`] for application code.
///
/// # Example
///
/// ```ignore
/// let callbacks = Callbacks::new()
///     .on_connected(|| println!("up"))
///     .on_disconnected(|| println!("down"))
///     .on_message(|value| println!("{value}"));
/// ```
pub struct Callbacks<M> {
    on_connected: Option<LifecycleFn>,
    on_disconnected: Option<LifecycleFn>,
    on_message: Option<MessageFn<M>>,
}

impl<M> Default for Callbacks<M> {
    fn default() -> Self {
        Self {
            on_connected: None,
            on_disconnected: None,
            on_message: None,
        }
    }
}

impl<M> Callbacks<M> {
    /// Creates an empty callback set; unregistered events are ignored.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the `connected` callback.
    #[inline]
    #[must_use]
    pub fn on_connected(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_connected = Some(Box::new(f));
        self
    }

    /// Registers the `disconnected` callback.
    #[inline]
    #[must_use]
    pub fn on_disconnected(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_disconnected = Some(Box::new(f));
        self
    }

    /// Registers the `message` callback.
    #[inline]
    #[must_use]
    pub fn on_message(mut self, f: impl FnMut(M) + Send + 'static) -> Self {
        self.on_message = Some(Box::new(f));
        self
    }
}

impl<M: Send + 'static> Handler<M> for Callbacks<M> {
    fn connected(&mut self) {
        if let Some(f) = self.on_connected.as_mut() {
            f();
        }
    }

    fn disconnected(&mut self) {
        if let Some(f) = self.on_disconnected.as_mut() {
            f();
        }
    }

    fn message(&mut self, message: M) {
        if let Some(f) = self.on_message.as_mut() {
            f(message);
        }
    }
}

// ============================================================================
// Notification
// ============================================================================

/// A callback rendered as a value, for consuming events from a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification<M> {
    /// See [`Handler::connected`].
    Connected,
    /// See [`Handler::disconnected`].
    Disconnected,
    /// See [`Handler::message`].
    Message(M),
}

/// Forwards every callback into the channel. A closed receiver is ignored.
impl<M: Send + 'static> Handler<M> for mpsc::UnboundedSender<Notification<M>> {
    fn connected(&mut self) {
        let _ = self.send(Notification::Connected);
    }

    fn disconnected(&mut self) {
        let _ = self.send(Notification::Disconnected);
    }

    fn message(&mut self, message: M) {
        let _ = self.send(Notification::Message(message));
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_callbacks_dispatch() {
        let connects = Arc::new(AtomicUsize::new(0));
        let messages = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let c = Arc::clone(&connects);
        let m = Arc::clone(&messages);
        let mut callbacks = Callbacks::new()
            .on_connected(move || {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .on_message(move |value: u32| m.lock().push(value));

        callbacks.connected();
        callbacks.disconnected();
        callbacks.message(7);
        callbacks.message(8);

        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(*messages.lock(), vec![7, 8]);
    }

    #[test]
    fn test_empty_callbacks_ignore_events() {
        let mut callbacks: Callbacks<String> = Callbacks::new();
        callbacks.connected();
        callbacks.disconnected();
        callbacks.message("dropped".into());
    }

    #[test]
    fn test_channel_handler() {
        let (mut tx, mut rx) = mpsc::unbounded_channel();
        Handler::<&str>::connected(&mut tx);
        tx.message("hello");
        Handler::<&str>::disconnected(&mut tx);

        assert_eq!(rx.try_recv().ok(), Some(Notification::Connected));
        assert_eq!(rx.try_recv().ok(), Some(Notification::Message("hello")));
        assert_eq!(rx.try_recv().ok(), Some(Notification::Disconnected));
    }
}
