use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};

use crate::state::{connections::ConnectionId, game::SessionId, locks::LockTable};

/// Session a connection is attached to, and the player it speaks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    /// Attached session.
    pub session_id: SessionId,
    /// Player the connection speaks for.
    pub player_key: String,
}

/// In-process coordination for session records: per-session locks, connection membership and
/// the gate serializing id allocation.
#[derive(Default)]
pub struct SessionRegistry {
    locks: LockTable<SessionId>,
    members: DashMap<ConnectionId, Membership>,
    allocation: Mutex<()>,
}

impl SessionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusive access to the record of `session_id`.
    pub async fn lock(&self, session_id: &SessionId) -> OwnedMutexGuard<()> {
        self.locks.acquire(session_id).await
    }

    /// Forget the lock of a session that reached a terminal state.
    pub fn release_lock(&self, session_id: &SessionId) -> bool {
        self.locks.evict(session_id)
    }

    /// Serializes read-increment-write of the id counter within the process.
    pub async fn allocation_gate(&self) -> MutexGuard<'_, ()> {
        self.allocation.lock().await
    }

    /// Record the session membership of a connection.
    pub fn attach(&self, connection: ConnectionId, membership: Membership) {
        self.members.insert(connection, membership);
    }

    /// Current membership of a connection.
    pub fn membership(&self, connection: &ConnectionId) -> Option<Membership> {
        self.members
            .get(connection)
            .map(|entry| entry.value().clone())
    }

    /// Drop the membership of every listed connection that still points at `session_id`.
    pub fn detach_all(&self, session_id: &SessionId, connections: &[ConnectionId]) {
        for connection in connections {
            self.members
                .remove_if(connection, |_, membership| &membership.session_id == session_id);
        }
    }

    /// Remove and return the membership of a connection.
    pub fn detach(&self, connection: &ConnectionId) -> Option<Membership> {
        self.members.remove(connection).map(|(_, membership)| membership)
    }

    /// Number of session locks currently tracked.
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }
}
