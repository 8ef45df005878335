//! Broadcast
//!
//! Resolves a group to its current members and queues one shared frame on
//! each of them.

use std::sync::Arc;

use super::registry::{GroupRegistry, ALL_CLIENTS};
use crate::protocol::{self, Fields};

/// Stateless fan-out helper over a [`GroupRegistry`]
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<GroupRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<GroupRegistry>) -> Self {
        Self { registry }
    }

    /// Send `{op, **fields}` to every connected session.
    ///
    /// Returns the number of sessions the frame was queued on.
    pub fn broadcast(&self, op: &str, fields: &Fields) -> usize {
        self.broadcast_to(ALL_CLIENTS, op, fields)
    }

    /// Send `{op, **fields}` to every session in `group` at call time.
    ///
    /// The frame is serialized once and the same bytes are queued on each
    /// member. An empty or unknown group is not an error.
    pub fn broadcast_to(&self, group: &str, op: &str, fields: &Fields) -> usize {
        let members = self.registry.members(group);
        if members.is_empty() {
            tracing::trace!(group = %group, op = %op, "Broadcast to empty group");
            return 0;
        }

        let frame: Arc<str> = Arc::from(protocol::encode(op, fields));
        for session in &members {
            session.enqueue(Arc::clone(&frame));
        }

        tracing::trace!(
            group = %group,
            op = %op,
            recipients = members.len(),
            "Broadcast event"
        );
        members.len()
    }

    pub fn registry(&self) -> &Arc<GroupRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::queue::Outbound;
    use crate::session::Session;
    use serde_json::{json, Value};

    #[test]
    fn test_broadcast_to_group_members_only() {
        let registry = Arc::new(GroupRegistry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        let (a, mut rx_a) = Session::create("a", Arc::clone(&registry));
        let (b, mut rx_b) = Session::create("b", Arc::clone(&registry));
        let (_c, mut rx_c) = Session::create("c", Arc::clone(&registry));
        a.join_group("room1").unwrap();
        b.join_group("room1").unwrap();

        let sent = broadcaster.broadcast_to("room1", "ping", &Fields::new());
        assert_eq!(sent, 2);

        for rx in [&mut rx_a, &mut rx_b] {
            let frames = rx.drain_frames();
            assert_eq!(frames.len(), 1);
            let value: Value = serde_json::from_str(&frames[0]).unwrap();
            assert_eq!(value, json!({"op": "ping"}));
        }
        assert!(rx_c.drain_frames().is_empty());
    }

    #[test]
    fn test_broadcast_shares_identical_bytes() {
        let registry = Arc::new(GroupRegistry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        let (_a, mut rx_a) = Session::create("a", Arc::clone(&registry));
        let (_b, mut rx_b) = Session::create("b", Arc::clone(&registry));

        broadcaster.broadcast("chatmsg", &Fields::new().with("text", "hi"));

        let (Some(Outbound::Frame(fa)), Some(Outbound::Frame(fb))) =
            (rx_a.try_recv(), rx_b.try_recv())
        else {
            panic!("expected a frame on both queues");
        };
        assert!(Arc::ptr_eq(&fa, &fb));
    }

    #[test]
    fn test_broadcast_empty_group() {
        let registry = Arc::new(GroupRegistry::new());
        let broadcaster = Broadcaster::new(registry);
        assert_eq!(broadcaster.broadcast_to("nobody", "ping", &Fields::new()), 0);
        assert_eq!(broadcaster.broadcast("ping", &Fields::new()), 0);
    }

    #[test]
    fn test_broadcast_skips_dropped_sessions() {
        let registry = Arc::new(GroupRegistry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        let (_a, mut rx_a) = Session::create("a", Arc::clone(&registry));
        let (b, _rx_b) = Session::create("b", Arc::clone(&registry));
        drop(b);

        assert_eq!(broadcaster.broadcast("ping", &Fields::new()), 1);
        assert_eq!(rx_a.drain_frames().len(), 1);
    }
}
