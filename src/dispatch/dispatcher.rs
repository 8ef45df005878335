//! Dispatcher
//!
//! Process-wide table from op name to handler. Built once at startup, then
//! shared read-only by every connection.

use futures_util::FutureExt;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::error::HandlerError;
use super::handler::{AsyncFn, Context, Handler, SyncFn, Typed};
use crate::protocol::{self, Fields};

/// What happened to a dispatched event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handler ran to completion
    Handled,
    /// Handler failed; an `error` event was queued for the client
    Failed,
    /// No handler is registered for the op
    Unknown,
}

/// Op name → handler table
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a handler to an op. A later registration for the same op wins.
    pub fn register(&mut self, op: impl Into<String>, handler: impl Handler) -> &mut Self {
        let op = op.into();
        if self.handlers.insert(op.clone(), Arc::new(handler)).is_some() {
            tracing::debug!(op = %op, "Replaced existing handler");
        }
        self
    }

    /// Bind an `async fn(Context, Fields)`
    pub fn on<F, Fut>(&mut self, op: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(Context, Fields) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.register(op, AsyncFn(f))
    }

    /// Bind a synchronous `fn(&Context, Fields)`
    pub fn on_sync<F>(&mut self, op: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&Context, Fields) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.register(op, SyncFn(f))
    }

    /// Bind an `async fn(Context, P)`; the fields are deserialized into `P`
    /// before the handler runs, and a mismatch is reported as a handler error.
    pub fn on_typed<P, F, Fut>(&mut self, op: impl Into<String>, f: F) -> &mut Self
    where
        P: DeserializeOwned + Send + 'static,
        F: Fn(Context, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.register(op, Typed::new(f))
    }

    pub fn contains(&self, op: &str) -> bool {
        self.handlers.contains_key(op)
    }

    /// Registered op names, sorted
    pub fn ops(&self) -> Vec<&str> {
        let mut ops: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        ops.sort_unstable();
        ops
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the handler for `op`.
    ///
    /// Unknown ops are dropped with a diagnostic. A handler error or panic is
    /// logged and reported to the originating session as an `error` event;
    /// the connection stays open either way.
    pub async fn dispatch(&self, ctx: &Context, op: &str, fields: Fields) -> DispatchOutcome {
        let session = ctx.session();

        let Some(handler) = self.handlers.get(op) else {
            tracing::warn!(session_id = %session.id(), op = %op, "No handler for operation");
            return DispatchOutcome::Unknown;
        };

        tracing::trace!(session_id = %session.id(), op = %op, "Dispatching event");

        let result = AssertUnwindSafe(handler.call(ctx.clone(), fields))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(HandlerError::Panic(panic_message(panic.as_ref()))));

        match result {
            Ok(()) => DispatchOutcome::Handled,
            Err(err) => {
                tracing::error!(
                    session_id = %session.id(),
                    op = %op,
                    kind = %err.kind(),
                    error = ?err,
                    "Handler failed"
                );
                session.send(
                    protocol::ERROR,
                    &Fields::new().with("msg", err.summary()),
                );
                DispatchOutcome::Failed
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("ops", &self.ops())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Broadcaster, GroupRegistry, OutboundReceiver, Session};
    use serde::Deserialize;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn context() -> (Context, OutboundReceiver) {
        let registry = Arc::new(GroupRegistry::new());
        let (session, rx) = Session::create("127.0.0.1:9000", Arc::clone(&registry));
        (Context::new(session, Broadcaster::new(registry)), rx)
    }

    fn frames(rx: &mut OutboundReceiver) -> Vec<Value> {
        rx.drain_frames()
            .iter()
            .map(|f| serde_json::from_str(f).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_unknown_op_is_silent() {
        let dispatcher = Dispatcher::new();
        let (ctx, mut rx) = context();

        let outcome = dispatcher.dispatch(&ctx, "nope", Fields::new()).await;

        assert_eq!(outcome, DispatchOutcome::Unknown);
        assert!(rx.drain_frames().is_empty());
    }

    #[tokio::test]
    async fn test_sync_and_async_handlers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new();

        let sync_calls = Arc::clone(&calls);
        dispatcher.on_sync("sync", move |ctx, fields| {
            sync_calls.fetch_add(1, Ordering::SeqCst);
            ctx.session().send("echo", &fields);
            Ok(())
        });
        dispatcher.on("async", |ctx: Context, _fields| async move {
            tokio::task::yield_now().await;
            ctx.session().eval_js("done()");
            Ok(())
        });

        let (ctx, mut rx) = context();
        let fields = Fields::new().with("n", 1);
        assert_eq!(
            dispatcher.dispatch(&ctx, "sync", fields).await,
            DispatchOutcome::Handled
        );
        assert_eq!(
            dispatcher.dispatch(&ctx, "async", Fields::new()).await,
            DispatchOutcome::Handled
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            frames(&mut rx),
            vec![
                json!({"op": "echo", "n": 1}),
                json!({"op": "eval_js", "script": "done()"}),
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_reports_error_event() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.on_sync("fail", |_ctx, _fields| {
            Err(HandlerError::custom("ValueError", "no such room"))
        });
        dispatcher.on_sync("ok", |ctx, _fields| {
            ctx.session().send("ok", &Fields::new());
            Ok(())
        });

        let (ctx, mut rx) = context();
        assert_eq!(
            dispatcher.dispatch(&ctx, "fail", Fields::new()).await,
            DispatchOutcome::Failed
        );
        assert_eq!(
            dispatcher.dispatch(&ctx, "ok", Fields::new()).await,
            DispatchOutcome::Handled
        );

        assert_eq!(
            frames(&mut rx),
            vec![
                json!({"op": "error", "msg": "ValueError: no such room"}),
                json!({"op": "ok"}),
            ]
        );
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.on_sync("explode", |_ctx, _fields| panic!("kaboom"));

        let (ctx, mut rx) = context();
        let outcome = dispatcher.dispatch(&ctx, "explode", Fields::new()).await;

        assert_eq!(outcome, DispatchOutcome::Failed);
        assert_eq!(
            frames(&mut rx),
            vec![json!({"op": "error", "msg": "Panic: handler panicked: kaboom"})]
        );
    }

    #[tokio::test]
    async fn test_typed_handler_missing_field() {
        #[derive(Deserialize)]
        struct Rename {
            name: String,
        }

        let mut dispatcher = Dispatcher::new();
        dispatcher.on_typed("name", |ctx: Context, payload: Rename| async move {
            ctx.session().rename(payload.name);
            Ok(())
        });

        let (ctx, mut rx) = context();

        let outcome = dispatcher
            .dispatch(&ctx, "name", Fields::new().with("name", "ada").with("extra", true))
            .await;
        assert_eq!(outcome, DispatchOutcome::Handled);
        assert_eq!(ctx.session().name(), "ada");

        let outcome = dispatcher.dispatch(&ctx, "name", Fields::new()).await;
        assert_eq!(outcome, DispatchOutcome::Failed);
        let errors = frames(&mut rx);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["op"], "error");
        assert_eq!(errors[0]["msg"], "InvalidPayload: missing field `name`");
    }

    #[test]
    fn test_last_registration_wins() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .on_sync("a", |_ctx, _fields| Ok(()))
            .on_sync("b", |_ctx, _fields| Ok(()))
            .on_sync("a", |_ctx, _fields| Err(HandlerError::custom("X", "y")));

        assert_eq!(dispatcher.len(), 2);
        assert_eq!(dispatcher.ops(), vec!["a", "b"]);
        assert!(dispatcher.contains("a"));
        assert!(!dispatcher.contains("c"));
    }
}
