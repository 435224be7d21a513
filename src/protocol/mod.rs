//! Subscription protocol wire types.
//!
//! Every frame exchanged by the subscription layer carries one [`Envelope`]:
//!
//! | Action | Direction | Purpose |
//! |--------|-----------|---------|
//! | `subscribe` | Client → Server | Declare the full topic set |
//! | `message` | Both | Carry opaque payload values |
//!
//! A `subscribe` received from the server is treated as an echo and ignored.

// ============================================================================
// Submodules
// ============================================================================

/// Envelope wire type.
pub mod envelope;

// ============================================================================
// Re-exports
// ============================================================================

pub use envelope::Envelope;
