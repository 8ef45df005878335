//! In-Memory Transport
//!
//! A connection whose far end is a [`Peer`] held by the caller. Used by the
//! session tests and the benchmarks to drive real pumps without sockets.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::transport::{Frame, FrameSink, FrameSource, TransportError};

/// What the server pushed to the peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivered {
    Text(String),
    Close { code: u16, reason: String },
}

enum Inbound {
    Frame(Frame),
    Fail,
}

/// Server-side receiving half
pub struct MemorySource {
    rx: mpsc::UnboundedReceiver<Inbound>,
}

/// Server-side sending half
pub struct MemorySink {
    tx: mpsc::UnboundedSender<Delivered>,
}

/// The client end of an in-memory connection
pub struct Peer {
    inbound: Option<mpsc::UnboundedSender<Inbound>>,
    outbound: mpsc::UnboundedReceiver<Delivered>,
}

/// Create a connected sink/source pair and the peer driving it
pub fn pair() -> (MemorySink, MemorySource, Peer) {
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    (
        MemorySink { tx: out_tx },
        MemorySource { rx: in_rx },
        Peer {
            inbound: Some(in_tx),
            outbound: out_rx,
        },
    )
}

#[async_trait]
impl FrameSource for MemorySource {
    async fn recv_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        match self.rx.recv().await? {
            Inbound::Frame(frame) => Some(Ok(frame)),
            Inbound::Fail => Some(Err(TransportError::Closed)),
        }
    }
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send_frame(&mut self, text: &str) -> Result<(), TransportError> {
        self.tx
            .send(Delivered::Text(text.to_string()))
            .map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<(), TransportError> {
        self.tx
            .send(Delivered::Close {
                code,
                reason: reason.to_string(),
            })
            .map_err(|_| TransportError::Closed)
    }
}

impl Peer {
    /// Send a text frame to the server
    pub fn send_text(&self, text: impl Into<String>) {
        self.push(Inbound::Frame(Frame::Text(text.into())));
    }

    /// Send a binary frame to the server
    pub fn send_binary(&self, data: impl Into<Vec<u8>>) {
        self.push(Inbound::Frame(Frame::Binary(data.into())));
    }

    /// Make the server's next receive fail with a transport error
    pub fn fail(&self) {
        self.push(Inbound::Fail);
    }

    /// Close the client side; the server sees end of stream
    pub fn close(&mut self) {
        self.inbound = None;
    }

    /// Next thing the server delivered, `None` once the server side is gone
    pub async fn recv(&mut self) -> Option<Delivered> {
        self.outbound.recv().await
    }

    /// Everything delivered so far without waiting
    pub fn drain(&mut self) -> Vec<Delivered> {
        let mut delivered = Vec::new();
        while let Ok(item) = self.outbound.try_recv() {
            delivered.push(item);
        }
        delivered
    }

    fn push(&self, item: Inbound) {
        if let Some(tx) = &self.inbound {
            let _ = tx.send(item);
        }
    }
}
