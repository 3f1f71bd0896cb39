use std::{collections::VecDeque, future::Future};

use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::{
    error::ServiceError,
    state::{connections::ConnectionId, game::QueueKey, locks::LockTable},
};

/// Result of entering a matchmaking line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome<T> {
    /// Nobody was waiting; the connection is now at the tail of the line.
    Waiting,
    /// The connection was paired with the head of the line.
    Paired {
        /// Connection popped from the head of the line.
        partner: ConnectionId,
        /// Value returned by the pairing callback.
        value: T,
    },
}

/// Waiting lines keyed by [`QueueKey`], guarded by one lock per key.
///
/// A connection is waiting on at most one key at a time; the membership map records which.
#[derive(Default)]
pub struct MatchmakingPool {
    waiting: DashMap<QueueKey, VecDeque<ConnectionId>>,
    membership: DashMap<ConnectionId, QueueKey>,
    locks: LockTable<QueueKey>,
}

impl MatchmakingPool {
    /// Pool with no lines.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the line for `key`, pairing with the head of the line when there is one.
    ///
    /// `on_pair` runs with the queue lock held and receives the popped partner; it is expected
    /// to create the session and notify both sides. When it fails the partner is put back at the
    /// head of the line and the joining connection is dropped from the pool.
    pub async fn join<F, Fut, T>(
        &self,
        connection: ConnectionId,
        key: QueueKey,
        on_pair: F,
    ) -> Result<JoinOutcome<T>, ServiceError>
    where
        F: FnOnce(ConnectionId) -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        // A connection only ever waits in one line.
        self.leave(&connection).await;

        let outcome = {
            let _guard = self.locks.acquire(&key).await;
            self.membership.insert(connection, key.clone());

            let partner = self
                .waiting
                .get_mut(&key)
                .and_then(|mut line| line.pop_front());

            match partner {
                None => {
                    self.waiting
                        .entry(key.clone())
                        .or_default()
                        .push_back(connection);
                    debug!(queue = %key, connection = %connection, "connection waiting for a partner");
                    Ok(JoinOutcome::Waiting)
                }
                Some(partner) => match on_pair(partner).await {
                    Ok(value) => {
                        self.membership.remove(&connection);
                        self.membership.remove(&partner);
                        self.waiting.remove_if(&key, |_, line| line.is_empty());
                        info!(queue = %key, %connection, %partner, "connections paired");
                        Ok(JoinOutcome::Paired { partner, value })
                    }
                    Err(err) => {
                        self.waiting
                            .entry(key.clone())
                            .or_default()
                            .push_front(partner);
                        self.membership.remove(&connection);
                        warn!(queue = %key, %connection, error = %err, "pairing failed; partner re-queued");
                        Err(err)
                    }
                },
            }
        };

        if !self.waiting.contains_key(&key) {
            self.locks.evict(&key);
        }
        outcome
    }

    /// Remove `connection` from whatever line it waits in. Returns `true` if it was waiting.
    pub async fn leave(&self, connection: &ConnectionId) -> bool {
        let Some(key) = self.membership.get(connection).map(|entry| entry.value().clone()) else {
            return false;
        };

        let removed = {
            let _guard = self.locks.acquire(&key).await;
            // The entry may have changed while we waited for the lock.
            let current = self
                .membership
                .get(connection)
                .map(|entry| entry.value().clone());
            if current.as_ref() != Some(&key) {
                false
            } else {
                self.membership.remove(connection);
                let removed = self
                    .waiting
                    .get_mut(&key)
                    .and_then(|mut line| {
                        line.iter()
                            .position(|waiting| waiting == connection)
                            .and_then(|index| line.remove(index))
                    })
                    .is_some();
                self.waiting.remove_if(&key, |_, line| line.is_empty());
                removed
            }
        };

        if !self.waiting.contains_key(&key) {
            self.locks.evict(&key);
        }
        removed
    }

    /// Snapshot of the connections waiting on `key`, head first.
    pub fn waiting(&self, key: &QueueKey) -> Vec<ConnectionId> {
        self.waiting
            .get(key)
            .map(|line| line.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Line the connection currently waits in, if any.
    pub fn queue_of(&self, connection: &ConnectionId) -> Option<QueueKey> {
        self.membership
            .get(connection)
            .map(|entry| entry.value().clone())
    }

    /// Number of lines with at least one waiting connection.
    pub fn line_count(&self) -> usize {
        self.waiting.len()
    }

    /// Number of queue locks currently tracked.
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }
}
