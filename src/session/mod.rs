//! Sessions and Groups
//!
//! ## Architecture
//!
//! - **Session**: one connected client (identity, joined groups, outbound queue)
//! - **OutboundQueue**: unbounded FIFO drained by the session's outbound pump
//! - **GroupRegistry**: group name → weakly held sessions
//! - **Broadcaster**: snapshot a group and queue one shared frame per member
//!
//! Every session is a member of [`ALL_CLIENTS`] from creation until teardown.
//! Names beginning with [`RESERVED_PREFIX`] cannot be joined or left by
//! application code.

mod broadcast;
mod connection;
mod queue;
mod registry;

pub use broadcast::Broadcaster;
pub use connection::{Session, SessionId};
pub use queue::{channel, CloseReason, Outbound, OutboundQueue, OutboundReceiver};
pub use registry::{GroupRegistry, ReservedNameError, ALL_CLIENTS, RESERVED_PREFIX};
