//! Group Registry
//!
//! Maps group names to the sessions currently in them. Membership is held by
//! `Weak` reference keyed by session id, so the registry never keeps a session
//! alive: a session whose last strong reference is gone simply stops showing
//! up in snapshots, and its dead entries are pruned on the next write. Sessions
//! also remove themselves explicitly on teardown.
//!
//! All operations take a short-lived lock and never hold it across an await,
//! so they are safe to interleave from any number of tasks.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use thiserror::Error;

use super::connection::{Session, SessionId};

/// Group every connected session belongs to
pub const ALL_CLIENTS: &str = "__all__";

/// Group names starting with this prefix are reserved for internal bookkeeping
pub const RESERVED_PREFIX: char = '_';

/// Client code tried to create or join a reserved group
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("group name `{name}` is reserved (names beginning with `_` are used internally)")]
pub struct ReservedNameError {
    pub name: String,
}

type Members = HashMap<SessionId, Weak<Session>>;

/// Named sets of sessions, used as broadcast targets
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: RwLock<HashMap<String, Members>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject names under the reserved prefix
    pub fn check_name(name: &str) -> Result<(), ReservedNameError> {
        if name.starts_with(RESERVED_PREFIX) {
            return Err(ReservedNameError {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Add a session to a group. Idempotent; no name check.
    pub(crate) fn insert(&self, group: &str, session: &Arc<Session>) {
        let mut groups = self.write();
        let members = groups.entry(group.to_string()).or_default();
        members.retain(|_, weak| weak.strong_count() > 0);
        members.insert(session.id(), Arc::downgrade(session));
    }

    /// Remove a session from a group. Idempotent; empty groups are dropped.
    pub(crate) fn remove(&self, group: &str, id: SessionId) {
        let mut groups = self.write();
        if let Some(members) = groups.get_mut(group) {
            members.remove(&id);
            members.retain(|_, weak| weak.strong_count() > 0);
            if members.is_empty() {
                groups.remove(group);
            }
        }
    }

    /// Remove a session from every group it appears in
    pub(crate) fn remove_everywhere(&self, id: SessionId) {
        let mut groups = self.write();
        groups.retain(|_, members| {
            members.remove(&id);
            !members.is_empty()
        });
    }

    /// Point-in-time copy of a group's live members.
    ///
    /// Sessions joining or leaving after the call do not affect the result.
    pub fn members(&self, group: &str) -> Vec<Arc<Session>> {
        self.read()
            .get(group)
            .map(|members| members.values().filter_map(Weak::upgrade).collect())
            .unwrap_or_default()
    }

    /// Number of live members in a group
    pub fn member_count(&self, group: &str) -> usize {
        self.read()
            .get(group)
            .map(|members| members.values().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }

    /// Whether a live session with this id is in the group
    pub fn contains(&self, group: &str, id: SessionId) -> bool {
        self.read()
            .get(group)
            .and_then(|members| members.get(&id))
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Names of all groups with at least one live member, sorted
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .read()
            .iter()
            .filter(|(_, members)| members.values().any(|w| w.strong_count() > 0))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Drop entries whose session is gone. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let mut groups = self.write();
        let mut removed = 0;
        groups.retain(|_, members| {
            let before = members.len();
            members.retain(|_, weak| weak.strong_count() > 0);
            removed += before - members.len();
            !members.is_empty()
        });
        removed
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Members>> {
        self.groups.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Members>> {
        self.groups.write().unwrap_or_else(PoisonError::into_inner)
    }
}
