//! Event Dispatch
//!
//! Routes each inbound event to the handler registered for its op.
//!
//! ```rust,no_run
//! use wszero::dispatch::{Context, Dispatcher, HandlerError};
//! use wszero::protocol::{Fields, CONNECT};
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher
//!     .on_sync(CONNECT, |ctx, _fields| {
//!         ctx.session().eval_js("document.title = 'hello';");
//!         Ok(())
//!     })
//!     .on("shout", |ctx: Context, fields: Fields| async move {
//!         let text: String = fields.require("text")?;
//!         ctx.broadcast("shout", &Fields::new().with("text", text.to_uppercase()));
//!         Ok::<(), HandlerError>(())
//!     });
//! ```

mod dispatcher;
mod error;
mod handler;

pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::HandlerError;
pub use handler::{Context, Handler};
