//! Title demo: every client that connects gets its page title rewritten.

use crate::dispatch::{Context, Dispatcher};
use crate::protocol::{CONNECT, DISCONNECT};

const SET_TITLE: &str = "document.title = 'Where is Kazakhstan';";

pub fn title_demo() -> Dispatcher {
    let mut dispatcher = Dispatcher::new();
    dispatcher
        .on_sync(CONNECT, |ctx: &Context, _fields| {
            tracing::info!(client = %ctx.session(), "Client connected");
            ctx.session().eval_js(SET_TITLE);
            Ok(())
        })
        .on_sync(DISCONNECT, |ctx: &Context, _fields| {
            tracing::info!(client = %ctx.session(), "Client disconnected");
            Ok(())
        });
    dispatcher
}
