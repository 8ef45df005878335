//! Connection Session
//!
//! Server-side state of one connected client: identity, explicit group
//! memberships, and the producer half of its outbound queue. The transport
//! itself is owned by the two pumps in [`crate::websocket`]; the session only
//! talks to them through its queue.

use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use uuid::Uuid;

use super::queue::{self, CloseReason, OutboundQueue, OutboundReceiver};
use super::registry::{GroupRegistry, ReservedNameError, ALL_CLIENTS};
use crate::protocol::{self, Fields};

/// Stable identifier of a session, unique for the life of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One live client connection
pub struct Session {
    id: SessionId,
    /// Transport-level address hint the session was created with
    peer: String,
    /// Display name; handlers may change it at any time
    name: RwLock<String>,
    /// Explicitly joined groups (never contains reserved names)
    groups: Mutex<BTreeSet<String>>,
    queue: OutboundQueue,
    registry: Arc<GroupRegistry>,
}

impl Session {
    /// Create a session and register it in the all-clients group.
    ///
    /// Returns the consumer half of its outbound queue, to be handed to the
    /// outbound pump.
    pub fn create(
        identity: impl Into<String>,
        registry: Arc<GroupRegistry>,
    ) -> (Arc<Self>, OutboundReceiver) {
        let identity = identity.into();
        let (queue, receiver) = queue::channel();

        let session = Arc::new(Self {
            id: SessionId::new(),
            peer: identity.clone(),
            name: RwLock::new(identity),
            groups: Mutex::new(BTreeSet::new()),
            queue,
            registry,
        });
        session.registry.insert(ALL_CLIENTS, &session);

        (session, receiver)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn name(&self) -> String {
        self.name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Change the display name. Concurrent renames are not serialized.
    pub fn rename(&self, name: impl Into<String>) {
        *self.name.write().unwrap_or_else(PoisonError::into_inner) = name.into();
    }

    /// Join a named group. Joining twice is a no-op.
    pub fn join_group(self: &Arc<Self>, name: &str) -> Result<(), ReservedNameError> {
        GroupRegistry::check_name(name)?;

        let mut groups = self.groups.lock().unwrap_or_else(PoisonError::into_inner);
        groups.insert(name.to_string());
        self.registry.insert(name, self);

        tracing::debug!(session_id = %self.id, group = %name, "Joined group");
        Ok(())
    }

    /// Leave a named group. Leaving a group never joined is a no-op.
    pub fn leave_group(&self, name: &str) -> Result<(), ReservedNameError> {
        GroupRegistry::check_name(name)?;

        let mut groups = self.groups.lock().unwrap_or_else(PoisonError::into_inner);
        groups.remove(name);
        self.registry.remove(name, self.id);

        tracing::debug!(session_id = %self.id, group = %name, "Left group");
        Ok(())
    }

    /// Explicitly joined groups, sorted
    pub fn groups(&self) -> Vec<String> {
        self.groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Whether the session is currently in `group` (including the all-clients group)
    pub fn is_member(&self, group: &str) -> bool {
        self.registry.contains(group, self.id)
    }

    /// Queue an already serialized frame. Never blocks, never fails.
    pub fn enqueue(&self, frame: Arc<str>) {
        self.queue.push(frame);
    }

    /// Serialize `{op, **fields}` and queue it
    pub fn send(&self, op: &str, fields: &Fields) {
        self.enqueue(Arc::from(protocol::encode(op, fields)));
    }

    /// Queue an arbitrary JSON value as one frame
    pub fn write(&self, message: &Value) {
        self.enqueue(Arc::from(message.to_string()));
    }

    /// Ask the browser to execute `script`
    pub fn eval_js(&self, script: impl Into<String>) {
        self.send(
            protocol::EVAL_JS,
            &Fields::new().with("script", script.into()),
        );
    }

    /// Leave every group and stop the outbound pump after what is already queued.
    pub(crate) fn teardown(&self, reason: Option<CloseReason>) {
        self.groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.registry.remove_everywhere(self.id);
        self.queue.close(reason);
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("peer", &self.peer)
            .finish()
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Session: {:?}>", self.name())
    }
}
