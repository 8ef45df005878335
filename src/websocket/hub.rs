//! Connection Hub
//!
//! The single server object shared by every connection: it owns the group
//! registry, the frozen dispatcher, the live-connection counter, and the
//! shutdown signal. Handlers reach it indirectly through their
//! [`Context`](crate::dispatch::Context).

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

use crate::dispatch::{Context, Dispatcher};
use crate::session::{Broadcaster, GroupRegistry, OutboundReceiver, Session, ALL_CLIENTS};

/// Configuration for the connection hub
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Maximum number of concurrent connections
    pub max_connections: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: 1024,
        }
    }
}

/// Manages all live sessions
pub struct Hub {
    registry: Arc<GroupRegistry>,
    dispatcher: Dispatcher,
    config: HubConfig,
    /// Flips to true once; every inbound pump watches it
    shutdown: watch::Sender<bool>,
    /// Number of admitted connections that have not yet finished
    active: watch::Sender<usize>,
}

/// A newly admitted connection
pub struct Admitted {
    pub session: Arc<Session>,
    pub queue: OutboundReceiver,
    pub slot: ConnectionSlot,
}

/// Holds one unit of the hub's connection budget until dropped
pub struct ConnectionSlot {
    hub: Arc<Hub>,
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.hub.active.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl Hub {
    /// Create a hub. The dispatcher cannot be changed afterwards.
    pub fn new(config: HubConfig, dispatcher: Dispatcher) -> Self {
        let (shutdown, _) = watch::channel(false);
        let (active, _) = watch::channel(0);

        Self {
            registry: Arc::new(GroupRegistry::new()),
            dispatcher,
            config,
            shutdown,
            active,
        }
    }

    /// Admit a connection and create its session.
    ///
    /// Fails once `max_connections` connections are live.
    pub fn connect(self: &Arc<Self>, identity: impl Into<String>) -> Result<Admitted, HubError> {
        if self.is_shutting_down() {
            return Err(HubError::ShuttingDown);
        }

        let limit = self.config.max_connections;
        let admitted = self.active.send_if_modified(|n| {
            if *n < limit {
                *n += 1;
                true
            } else {
                false
            }
        });
        if !admitted {
            tracing::warn!(limit, "Connection rejected, hub is full");
            return Err(HubError::TooManyConnections(limit));
        }

        let slot = ConnectionSlot {
            hub: Arc::clone(self),
        };
        let (session, queue) = Session::create(identity, Arc::clone(&self.registry));

        tracing::info!(session_id = %session.id(), peer = %session.peer(), "Client connected");
        Ok(Admitted {
            session,
            queue,
            slot,
        })
    }

    /// Handler context for a session of this hub
    pub fn context(&self, session: Arc<Session>) -> Context {
        Context::new(session, self.broadcaster())
    }

    pub fn broadcaster(&self) -> Broadcaster {
        Broadcaster::new(Arc::clone(&self.registry))
    }

    pub fn registry(&self) -> &Arc<GroupRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Number of admitted connections that have not finished
    pub fn connection_count(&self) -> usize {
        *self.active.borrow()
    }

    /// Whether a new connection would be rejected for capacity
    pub fn is_full(&self) -> bool {
        self.connection_count() >= self.config.max_connections
    }

    /// Currently connected sessions
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.registry.members(ALL_CLIENTS)
    }

    /// Ask every connection to close with 1001 "Server shutdown".
    pub fn shutdown(&self) {
        if !self.shutdown.send_replace(true) {
            tracing::info!(
                connections = self.connection_count(),
                "Closing all connections"
            );
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Receiver that resolves once [`Hub::shutdown`] is called
    pub fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Wait until every connection has finished, up to `grace`.
    ///
    /// Returns false if connections were still open when the grace period ran out.
    pub async fn wait_idle(&self, grace: Duration) -> bool {
        let mut active = self.active.subscribe();
        let idle = tokio::time::timeout(grace, active.wait_for(|n| *n == 0))
            .await
            .is_ok();
        idle
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("connections", &self.connection_count())
            .field("dispatcher", &self.dispatcher)
            .field("config", &self.config)
            .finish()
    }
}

/// Errors that can occur in the connection hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Too many connections (limit: {0})")]
    TooManyConnections(usize),

    #[error("Server is shutting down")]
    ShuttingDown,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hub(max_connections: usize) -> Arc<Hub> {
        Arc::new(Hub::new(HubConfig { max_connections }, Dispatcher::new()))
    }

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();
        assert_eq!(config.max_connections, 1024);
    }

    #[test]
    fn test_connect_registers_session() {
        let hub = hub(8);
        let admitted = hub.connect("127.0.0.1:4000").unwrap();

        assert_eq!(hub.connection_count(), 1);
        assert_eq!(hub.sessions().len(), 1);
        assert!(admitted.session.is_member(ALL_CLIENTS));

        drop(admitted);
        assert_eq!(hub.connection_count(), 0);
    }

    #[test]
    fn test_connection_limit() {
        let hub = hub(2);

        let first = hub.connect("a").unwrap();
        let _second = hub.connect("b").unwrap();
        assert!(hub.is_full());

        let result = hub.connect("c");
        assert!(matches!(result, Err(HubError::TooManyConnections(2))));

        drop(first);
        assert!(hub.connect("d").is_ok());
    }

    #[test]
    fn test_no_connections_after_shutdown() {
        let hub = hub(2);
        hub.shutdown();
        hub.shutdown();

        assert!(hub.is_shutting_down());
        assert!(matches!(hub.connect("a"), Err(HubError::ShuttingDown)));
    }

    #[tokio::test]
    async fn test_wait_idle() {
        let hub = hub(2);
        assert!(hub.wait_idle(Duration::from_millis(10)).await);

        let admitted = hub.connect("a").unwrap();
        assert!(!hub.wait_idle(Duration::from_millis(10)).await);

        let waiter = {
            let hub = Arc::clone(&hub);
            tokio::spawn(async move { hub.wait_idle(Duration::from_secs(5)).await })
        };
        drop(admitted);
        assert!(waiter.await.unwrap());
    }
}
