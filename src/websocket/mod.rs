//! WebSocket Connections
//!
//! Drives browser connections through their lifetime.
//!
//! ## Architecture
//!
//! - **Hub**: the server object (registry, dispatcher, limits, shutdown)
//! - **Pumps**: per-connection inbound dispatch and outbound delivery loops
//! - **Transport**: the `FrameSource`/`FrameSink` seam, implemented for the
//!   axum WebSocket halves and for an in-memory [`memory`] peer
//! - **Handler**: the axum upgrade endpoint
//!
//! ## Example
//!
//! ```javascript
//! // Browser
//! const ws = new WebSocket('ws://localhost:8000/ws');
//! ws.onmessage = (event) => console.log(JSON.parse(event.data));
//! ws.onopen = () => ws.send(JSON.stringify({op: 'name', name: 'ada'}));
//! ```

mod handler;
mod hub;
pub mod memory;
mod pump;
mod transport;

pub use handler::websocket_handler;
pub use hub::{Admitted, ConnectionSlot, Hub, HubConfig, HubError};
pub use pump::{run_connection, run_inbound_pump, run_outbound_pump, serve_connection, InboundExit};
pub use transport::{Frame, FrameSink, FrameSource, TransportError};
