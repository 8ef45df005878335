//! Connection Pumps
//!
//! Each connection runs two loops that only share the session's outbound
//! queue:
//!
//! - the **outbound pump** drains the queue onto the transport until it
//!   dequeues the close sentinel;
//! - the **inbound pump** fires `connect`, decodes and dispatches frames one
//!   at a time, then fires `disconnect` and pushes the close sentinel.
//!
//! [`serve_connection`] wires both to a [`Hub`] for one accepted transport.

use std::sync::Arc;
use tokio::sync::watch;

use super::hub::{Admitted, Hub, HubError};
use super::transport::{Frame, FrameSink, FrameSource};
use crate::dispatch::{Context, Dispatcher};
use crate::protocol::{self, Event, Fields, ProtocolError};
use crate::session::{CloseReason, Outbound, OutboundReceiver, SessionId};

/// Why an inbound pump stopped
#[derive(Debug)]
pub enum InboundExit {
    /// The peer closed the connection
    Closed,
    /// Receiving failed at the transport level
    TransportFailed,
    /// The peer sent a frame that is not a valid event
    Protocol(ProtocolError),
    /// The hub is shutting down
    Shutdown,
}

impl InboundExit {
    /// Close frame the outbound pump should send, if any
    pub fn close_reason(&self) -> Option<CloseReason> {
        match self {
            Self::Closed | Self::TransportFailed => None,
            Self::Protocol(_) => Some(CloseReason::invalid_payload()),
            Self::Shutdown => Some(CloseReason::going_away()),
        }
    }
}

/// Drain `queue` onto `sink` in FIFO order until the close sentinel.
///
/// Returns the number of frames sent. Stops early if the transport fails;
/// anything still queued is dropped.
pub async fn run_outbound_pump<S: FrameSink>(
    session_id: SessionId,
    mut queue: OutboundReceiver,
    sink: &mut S,
) -> usize {
    let mut sent = 0;

    while let Some(item) = queue.recv().await {
        match item {
            Outbound::Frame(frame) => {
                if let Err(e) = sink.send_frame(&frame).await {
                    tracing::debug!(
                        session_id = %session_id,
                        error = %e,
                        "Send failed, stopping outbound pump"
                    );
                    break;
                }
                sent += 1;
            }
            Outbound::Close(reason) => {
                if let Some(reason) = reason {
                    if let Err(e) = sink.close(reason.code, &reason.reason).await {
                        tracing::debug!(session_id = %session_id, error = %e, "Close failed");
                    }
                }
                break;
            }
        }
    }

    tracing::trace!(session_id = %session_id, sent, "Outbound pump finished");
    sent
}

/// Dispatch `connect`, then every inbound event, then `disconnect`.
///
/// Events of one session are handled strictly one after another. On exit the
/// session leaves every group and its outbound pump is told to stop.
pub async fn run_inbound_pump<R: FrameSource>(
    ctx: &Context,
    dispatcher: &Dispatcher,
    source: &mut R,
    mut shutdown: watch::Receiver<bool>,
) -> InboundExit {
    let session = ctx.session();

    dispatcher
        .dispatch(ctx, protocol::CONNECT, Fields::new())
        .await;

    let exit = loop {
        let received = tokio::select! {
            biased;
            _ = shutdown.wait_for(|stop| *stop) => break InboundExit::Shutdown,
            received = source.recv_frame() => received,
        };

        let frame = match received {
            None => break InboundExit::Closed,
            Some(Err(e)) => {
                tracing::debug!(session_id = %session.id(), error = %e, "Receive failed");
                break InboundExit::TransportFailed;
            }
            Some(Ok(frame)) => frame,
        };

        let decoded = match &frame {
            Frame::Text(text) => Event::parse(text),
            Frame::Binary(data) => Event::parse_bytes(data),
        };
        let event = match decoded {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(session_id = %session.id(), error = %e, "Malformed event frame");
                break InboundExit::Protocol(e);
            }
        };

        if protocol::is_synthetic(&event.op) {
            tracing::warn!(
                session_id = %session.id(),
                op = %event.op,
                "Client sent a server-only event, ignored"
            );
            continue;
        }

        tracing::debug!(session_id = %session.id(), op = %event.op, "Received event");
        dispatcher.dispatch(ctx, &event.op, event.fields).await;
    };

    dispatcher
        .dispatch(ctx, protocol::DISCONNECT, Fields::new())
        .await;
    session.teardown(exit.close_reason());

    exit
}

/// Run one accepted connection to completion.
///
/// Admits the connection, starts its outbound pump, runs its inbound pump on
/// the current task, and returns once both have finished.
pub async fn serve_connection<S, R>(
    hub: Arc<Hub>,
    identity: impl Into<String>,
    sink: S,
    source: R,
) -> Result<InboundExit, HubError>
where
    S: FrameSink + 'static,
    R: FrameSource,
{
    let admitted = hub.connect(identity)?;
    Ok(run_connection(hub, admitted, sink, source).await)
}

/// Drive an already admitted connection until both pumps have finished.
pub async fn run_connection<S, R>(
    hub: Arc<Hub>,
    admitted: Admitted,
    mut sink: S,
    mut source: R,
) -> InboundExit
where
    S: FrameSink + 'static,
    R: FrameSource,
{
    let Admitted {
        session,
        queue,
        slot,
    } = admitted;
    let session_id = session.id();

    let outbound =
        tokio::spawn(async move { run_outbound_pump(session_id, queue, &mut sink).await });

    let ctx = hub.context(session);
    let exit = run_inbound_pump(&ctx, hub.dispatcher(), &mut source, hub.subscribe_shutdown()).await;

    if let Err(e) = outbound.await {
        tracing::error!(session_id = %session_id, error = %e, "Outbound pump panicked");
    }

    tracing::info!(
        session_id = %session_id,
        name = %ctx.session().name(),
        reason = ?exit,
        "Client disconnected"
    );
    drop(slot);
    exit
}
