//! WebSocket Handler
//!
//! Handles WebSocket upgrade requests and hands the upgraded socket to the
//! connection pumps.

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::Response,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::Arc;

use super::hub::{Hub, HubError};
use super::pump::run_connection;
use super::transport::{Frame, FrameSink, FrameSource, TransportError};
use crate::api::{ApiError, AppState};
use crate::dispatch::HandlerError;
use crate::protocol::{self, Fields};
use crate::session::CloseReason;

/// WebSocket upgrade handler
///
/// This is the entry point for WebSocket connections. The peer's socket
/// address becomes the session's initial identity.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let hub = Arc::clone(&state.hub);
    if hub.is_full() {
        return Err(ApiError::ServiceUnavailable(format!(
            "connection limit of {} reached",
            hub.config().max_connections
        )));
    }

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, addr, hub)))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, addr: SocketAddr, hub: Arc<Hub>) {
    let (mut sender, receiver) = socket.split();

    // The hub may have filled up between the upgrade check and now
    let admitted = match hub.connect(addr.to_string()) {
        Ok(admitted) => admitted,
        Err(e) => {
            tracing::warn!(peer = %addr, error = %e, "Rejecting WebSocket connection");
            let close = match e {
                HubError::ShuttingDown => CloseReason::going_away(),
                HubError::TooManyConnections(_) => CloseReason::try_again_later(),
            };
            let error = HandlerError::custom("ConnectionRefused", e.to_string());
            let text = protocol::encode(protocol::ERROR, &Fields::new().with("msg", error.summary()));
            let _ = sender.send_frame(&text).await;
            let _ = FrameSink::close(&mut sender, close.code, &close.reason).await;
            return;
        }
    };

    run_connection(hub, admitted, sender, receiver).await;
}

#[async_trait]
impl FrameSource for SplitStream<WebSocket> {
    async fn recv_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        while let Some(message) = self.next().await {
            match message {
                Ok(Message::Text(text)) => return Some(Ok(Frame::Text(text))),
                Ok(Message::Binary(data)) => return Some(Ok(Frame::Binary(data))),
                // Axum answers pings itself
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                Ok(Message::Close(frame)) => {
                    tracing::debug!(close = ?frame, "Client requested close");
                    return None;
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
        None
    }
}

#[async_trait]
impl FrameSink for SplitSink<WebSocket, Message> {
    async fn send_frame(&mut self, text: &str) -> Result<(), TransportError> {
        self.send(Message::Text(text.to_string()))
            .await
            .map_err(TransportError::from)
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<(), TransportError> {
        let frame = CloseFrame {
            code,
            reason: Cow::Owned(reason.to_string()),
        };
        self.send(Message::Close(Some(frame)))
            .await
            .map_err(TransportError::from)
    }
}
