//! Outbound Queue
//!
//! Ordered, unbounded, single-consumer delivery queue owned by one session.
//! The producer side never blocks and never fails; the consumer side is
//! drained by the session's outbound pump.

use std::borrow::Cow;
use std::sync::Arc;
use tokio::sync::mpsc;

/// How the server closes a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    pub code: u16,
    pub reason: Cow<'static, str>,
}

impl CloseReason {
    /// 1001: the server is going away
    pub const fn going_away() -> Self {
        Self {
            code: 1001,
            reason: Cow::Borrowed("Server shutdown"),
        }
    }

    /// 1007: the peer sent a frame that is not a valid event
    pub const fn invalid_payload() -> Self {
        Self {
            code: 1007,
            reason: Cow::Borrowed("Malformed event"),
        }
    }

    /// 1013: the server is at capacity
    pub const fn try_again_later() -> Self {
        Self {
            code: 1013,
            reason: Cow::Borrowed("Too many connections"),
        }
    }
}

/// An entry on the outbound queue
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// A fully serialized frame, possibly shared with other queues
    Frame(Arc<str>),
    /// Stop the outbound pump, closing the transport first if a reason is given
    Close(Option<CloseReason>),
}

/// Producer half of a session's outbound queue
#[derive(Debug, Clone)]
pub struct OutboundQueue {
    tx: mpsc::UnboundedSender<Outbound>,
}

/// Consumer half, owned by the outbound pump
#[derive(Debug)]
pub struct OutboundReceiver {
    rx: mpsc::UnboundedReceiver<Outbound>,
}

/// Create a connected queue pair
pub fn channel() -> (OutboundQueue, OutboundReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (OutboundQueue { tx }, OutboundReceiver { rx })
}

impl OutboundQueue {
    /// Append a frame. Frames pushed after the pump has exited are dropped.
    pub fn push(&self, frame: Arc<str>) {
        if self.tx.send(Outbound::Frame(frame)).is_err() {
            tracing::trace!("Outbound pump gone, frame dropped");
        }
    }

    /// Append the close sentinel
    pub fn close(&self, reason: Option<CloseReason>) {
        let _ = self.tx.send(Outbound::Close(reason));
    }
}

impl OutboundReceiver {
    /// Wait for the next entry
    pub async fn recv(&mut self) -> Option<Outbound> {
        self.rx.recv().await
    }

    /// Take the next entry if one is ready
    pub fn try_recv(&mut self) -> Option<Outbound> {
        self.rx.try_recv().ok()
    }

    /// Collect every ready frame's text, stopping at the close sentinel
    pub fn drain_frames(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Some(Outbound::Frame(frame)) = self.try_recv() {
            frames.push(frame.to_string());
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_then_close() {
        let (queue, mut rx) = channel();
        queue.push(Arc::from("a"));
        queue.push(Arc::from("b"));
        queue.close(None);
        queue.push(Arc::from("c"));

        assert_eq!(rx.recv().await, Some(Outbound::Frame(Arc::from("a"))));
        assert_eq!(rx.recv().await, Some(Outbound::Frame(Arc::from("b"))));
        assert_eq!(rx.recv().await, Some(Outbound::Close(None)));
    }

    #[test]
    fn test_push_after_receiver_dropped() {
        let (queue, rx) = channel();
        drop(rx);
        queue.push(Arc::from("lost"));
        queue.close(Some(CloseReason::going_away()));
    }

    #[test]
    fn test_drain_frames() {
        let (queue, mut rx) = channel();
        queue.push(Arc::from("one"));
        queue.push(Arc::from("two"));
        assert_eq!(rx.drain_frames(), vec!["one", "two"]);
        assert!(rx.try_recv().is_none());
    }
}
