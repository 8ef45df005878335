//! # wszero
//!
//! Minimal real-time messaging substrate: browser clients connect over a
//! WebSocket, exchange `{op, ...fields}` JSON events with the server, and the
//! server addresses single clients, named groups, or everyone.
//!
//! ## Features
//!
//! - **Dispatch**: op name → handler table with per-event failure isolation
//! - **Groups**: non-owning membership, snapshot broadcasts, one encode per fan-out
//! - **Server-driven UI**: `eval_js` events run scripts in the browser
//! - **Ordered delivery**: one FIFO outbound queue per connection
//!
//! ## Modules
//!
//! - [`protocol`]: Event frames and handler payloads
//! - [`session`]: Sessions, outbound queues, group registry, broadcasts
//! - [`dispatch`]: Handler registration and dispatch
//! - [`websocket`]: Connection hub and per-connection pumps
//! - [`api`]: HTTP server with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wszero::dispatch::{Context, Dispatcher};
//! use wszero::protocol::{Fields, CONNECT};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut dispatcher = Dispatcher::new();
//!     dispatcher
//!         .on_sync(CONNECT, |ctx: &Context, _fields| {
//!             ctx.session().eval_js("document.title = 'hello';");
//!             Ok(())
//!         })
//!         .on_sync("shout", |ctx: &Context, fields: Fields| {
//!             let text: String = fields.require("text")?;
//!             ctx.broadcast("shout", &Fields::new().with("text", text.to_uppercase()));
//!             Ok(())
//!         });
//!
//!     wszero::cli::run(dispatcher).await
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod demos;
pub mod dispatch;
pub mod protocol;
pub mod session;
pub mod telemetry;
pub mod websocket;

// Re-export top-level types for convenience
pub use protocol::{Event, Fields, ProtocolError};

pub use session::{Broadcaster, GroupRegistry, ReservedNameError, Session, SessionId};

pub use dispatch::{Context, DispatchOutcome, Dispatcher, Handler, HandlerError};

pub use websocket::{serve_connection, Hub, HubConfig, HubError};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{Config, ConfigError};
