//! Framing layer.
//!
//! Converts between logical messages and the newline-delimited text the
//! transport carries.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `line` | Stateful line codec |
//! | `framed` | Transport wrapper speaking whole messages |

/// Stateful line codec.
pub mod line;

/// Transport wrapper speaking whole messages.
pub mod framed;

pub use framed::{FrameSender, FramedTransport};
pub use line::{DELIMITER, LineCodec, MAX_FRAME_LEN};
