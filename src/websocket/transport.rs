//! Transport Seam
//!
//! The pumps only need to pull frames from and push frames to a connection.
//! These traits describe that surface so the session machinery does not care
//! whether the other end is an axum WebSocket or an in-memory test peer.

use async_trait::async_trait;
use thiserror::Error;

/// A data frame received from the peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// Transport-level failure
#[derive(Error, Debug)]
pub enum TransportError {
    /// The connection is already closed
    #[error("connection closed")]
    Closed,

    /// WebSocket protocol or I/O error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] axum::Error),
}

/// Receiving half of a connection
#[async_trait]
pub trait FrameSource: Send {
    /// Next data frame, or `None` once the peer has closed the connection.
    ///
    /// Must be cancel safe: the inbound pump races it against shutdown.
    async fn recv_frame(&mut self) -> Option<Result<Frame, TransportError>>;
}

/// Sending half of a connection
#[async_trait]
pub trait FrameSink: Send {
    async fn send_frame(&mut self, text: &str) -> Result<(), TransportError>;

    async fn close(&mut self, code: u16, reason: &str) -> Result<(), TransportError>;
}
