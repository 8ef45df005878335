//! Wire Protocol
//!
//! Every frame exchanged with a browser client is a flat JSON object carrying
//! an `op` tag plus arbitrary fields:
//!
//! ```json
//! {"op": "chatmsg", "text": "hello"}
//! ```
//!
//! Inbound frames are decoded into an [`Event`] whose `op` has been split off
//! from the remaining [`Fields`]. Outbound frames are encoded once into text
//! and shared between every queue they are delivered to.

mod error;
mod event;

pub use error::ProtocolError;
pub use event::{encode, Event, Fields};

/// Synthetic event dispatched before any inbound frame of a connection.
pub const CONNECT: &str = "connect";

/// Synthetic event dispatched after the last inbound frame of a connection.
pub const DISCONNECT: &str = "disconnect";

/// Outbound op executing its `script` field in the browser.
pub const EVAL_JS: &str = "eval_js";

/// Outbound op reporting a failed handler back to the client.
pub const ERROR: &str = "error";

/// Returns true for ops that only the server may fire.
pub fn is_synthetic(op: &str) -> bool {
    op == CONNECT || op == DISCONNECT
}
