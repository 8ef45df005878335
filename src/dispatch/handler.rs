//! Event Handlers
//!
//! A handler receives the [`Context`] of the session that produced the event
//! and the event's [`Fields`]. Plain closures and `async fn`s are adapted to
//! the [`Handler`] trait by the registration helpers on
//! [`Dispatcher`](super::Dispatcher).

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use super::error::HandlerError;
use crate::protocol::Fields;
use crate::session::{Broadcaster, Session};

/// What a handler gets to work with besides the event payload
#[derive(Debug, Clone)]
pub struct Context {
    session: Arc<Session>,
    broadcaster: Broadcaster,
}

impl Context {
    pub fn new(session: Arc<Session>, broadcaster: Broadcaster) -> Self {
        Self {
            session,
            broadcaster,
        }
    }

    /// Session the event came from
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Broadcast to every connected session
    pub fn broadcast(&self, op: &str, fields: &Fields) -> usize {
        self.broadcaster.broadcast(op, fields)
    }

    /// Broadcast to the members of `group`
    pub fn broadcast_to(&self, group: &str, op: &str, fields: &Fields) -> usize {
        self.broadcaster.broadcast_to(group, op, fields)
    }
}

/// Something that can handle one kind of event
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn call(&self, ctx: Context, fields: Fields) -> Result<(), HandlerError>;
}

/// Adapter for `async fn(Context, Fields)`
pub(crate) struct AsyncFn<F>(pub(crate) F);

#[async_trait]
impl<F, Fut> Handler for AsyncFn<F>
where
    F: Fn(Context, Fields) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn call(&self, ctx: Context, fields: Fields) -> Result<(), HandlerError> {
        (self.0)(ctx, fields).await
    }
}

/// Adapter for `fn(&Context, Fields)`
pub(crate) struct SyncFn<F>(pub(crate) F);

#[async_trait]
impl<F> Handler for SyncFn<F>
where
    F: Fn(&Context, Fields) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    async fn call(&self, ctx: Context, fields: Fields) -> Result<(), HandlerError> {
        (self.0)(&ctx, fields)
    }
}

/// Adapter for `async fn(Context, P)` where `P` is deserialized from the fields
pub(crate) struct Typed<P, F> {
    f: F,
    _payload: PhantomData<fn() -> P>,
}

impl<P, F> Typed<P, F> {
    pub(crate) fn new(f: F) -> Self {
        Self {
            f,
            _payload: PhantomData,
        }
    }
}

#[async_trait]
impl<P, F, Fut> Handler for Typed<P, F>
where
    P: DeserializeOwned + Send + 'static,
    F: Fn(Context, P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn call(&self, ctx: Context, fields: Fields) -> Result<(), HandlerError> {
        let payload = fields.parse::<P>()?;
        (self.f)(ctx, payload).await
    }
}
