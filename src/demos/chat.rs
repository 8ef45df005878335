//! Chat demo
//!
//! On connect the client is asked for a name. Once it answers, the page is
//! replaced by an input box and a message log, and everything typed is
//! broadcast to all clients as `chatmsg` events.

use serde::Deserialize;

use crate::dispatch::{Context, Dispatcher};
use crate::protocol::{Fields, CONNECT, DISCONNECT};

const ASK_NAME: &str = r#"
document.title = 'Chat demo';
var name = prompt('What is your name?');
send_msg({op: 'name', name: name});
"#;

const CHAT_UI: &str = r#"
document.body.innerHTML = '';
inp = document.createElement('input');
document.body.appendChild(inp);
inp.addEventListener(
    'keydown',
    (event) => {
        if (event.keyCode == 13) {
            send_msg({op: 'chatmsg', text: inp.value});
            inp.value = '';
        }
    },
    false
);

log = document.createElement('div');
document.body.appendChild(log);

HANDLERS['chatmsg'] = (params) => {
    const div = document.createElement('div');
    const name = document.createElement('strong');
    name.innerText = params.sender;
    const text = document.createTextNode(' ' + params.text);
    div.appendChild(name);
    div.appendChild(text);
    log.appendChild(div);
};
"#;

#[derive(Debug, Deserialize)]
struct Name {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ChatMsg {
    text: String,
}

fn chat_line(ctx: &Context, text: &str) {
    let fields = Fields::new()
        .with("sender", ctx.session().name())
        .with("text", text);
    ctx.broadcast("chatmsg", &fields);
}

pub fn chat_demo() -> Dispatcher {
    let mut dispatcher = Dispatcher::new();
    dispatcher
        .on_sync(CONNECT, |ctx: &Context, _fields| {
            tracing::info!(client = %ctx.session(), "Client connected");
            ctx.session().eval_js(ASK_NAME);
            Ok(())
        })
        .on_typed("name", |ctx: Context, payload: Name| async move {
            tracing::info!(from = %ctx.session().name(), to = %payload.name, "Client renamed");
            ctx.session().rename(payload.name);
            chat_line(&ctx, "connected");
            ctx.session().eval_js(CHAT_UI);
            Ok(())
        })
        .on_typed("chatmsg", |ctx: Context, payload: ChatMsg| async move {
            chat_line(&ctx, &payload.text);
            tracing::info!(sender = %ctx.session().name(), text = %payload.text, "Chat message");
            Ok(())
        })
        .on_sync(DISCONNECT, |ctx: &Context, _fields| {
            tracing::info!(client = %ctx.session(), "Client disconnected");
            chat_line(ctx, "disconnected");
            Ok(())
        });
    dispatcher
}
