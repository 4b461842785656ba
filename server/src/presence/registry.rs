use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use crate::ws::ConnectionId;

/// A registered identity and the socket it is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEntry {
    pub user_id: String,
    pub connection_id: ConnectionId,
}

#[derive(Default)]
struct Index {
    /// user_id -> owning connection
    by_user: HashMap<String, ConnectionId>,
    /// Reverse mapping: connection -> identities it registered
    by_connection: HashMap<ConnectionId, HashSet<String>>,
}

/// Maps user identities to the connection that registered them first.
///
/// Each call takes the lock once, so `register`, `remove` and `lookup` are each atomic
/// with respect to one another. Nothing spans calls.
#[derive(Default)]
pub struct PresenceRegistry {
    index: Mutex<Index>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Index> {
        // The index is never left half-updated, so a poisoned lock is still usable.
        self.index.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Bind `user_id` to `connection_id` unless the identity is already present.
    ///
    /// Returns `true` if a new entry was created. A duplicate registration keeps the
    /// existing binding and discards the new handle.
    pub fn register(&self, user_id: &str, connection_id: ConnectionId) -> bool {
        let mut index = self.lock();
        if index.by_user.contains_key(user_id) {
            return false;
        }
        index.by_user.insert(user_id.to_string(), connection_id);
        index
            .by_connection
            .entry(connection_id)
            .or_default()
            .insert(user_id.to_string());
        true
    }

    /// Drop every identity bound to `connection_id`. Returns the identities removed,
    /// which is empty when the connection never registered.
    pub fn remove(&self, connection_id: ConnectionId) -> Vec<String> {
        let mut index = self.lock();
        let Some(user_ids) = index.by_connection.remove(&connection_id) else {
            return Vec::new();
        };
        for user_id in &user_ids {
            index.by_user.remove(user_id);
        }
        user_ids.into_iter().collect()
    }

    pub fn lookup(&self, user_id: &str) -> Option<PresenceEntry> {
        let index = self.lock();
        index.by_user.get(user_id).map(|connection_id| PresenceEntry {
            user_id: user_id.to_string(),
            connection_id: *connection_id,
        })
    }

    /// Number of registered identities.
    pub fn len(&self) -> usize {
        self.lock().by_user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
