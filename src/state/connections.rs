use std::collections::HashSet;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::{dto::ws::ServerMessage, state::game::SessionId};

/// Identity of one live player connection.
pub type ConnectionId = Uuid;

/// Instruction handed to a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Serialize and send an event.
    Event(ServerMessage),
    /// Close the socket.
    Close,
}

#[derive(Clone)]
/// Handle used to push messages to a connected player.
pub struct ConnectionHandle {
    /// Connection identity.
    pub id: ConnectionId,
    /// Sender feeding the writer task.
    pub tx: mpsc::UnboundedSender<Outbound>,
}

impl ConnectionHandle {
    /// Create a handle with a fresh identifier, returning the receiving end for the writer.
    pub fn open() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }
}

/// Live connections plus the broadcast group each session fans out to.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionHandle>,
    groups: DashMap<SessionId, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a live connection.
    pub fn register(&self, handle: ConnectionHandle) {
        self.connections.insert(handle.id, handle);
    }

    /// Forget a connection.
    pub fn unregister(&self, id: &ConnectionId) {
        self.connections.remove(id);
    }

    /// Whether the connection is live.
    pub fn is_registered(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no connection is live.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    fn push(&self, id: &ConnectionId, outbound: Outbound) -> bool {
        // Clone the sender out so the shard lock is not held while sending.
        let Some(tx) = self.connections.get(id).map(|entry| entry.tx.clone()) else {
            debug!(connection = %id, "dropping message for unknown connection");
            return false;
        };
        tx.send(outbound).is_ok()
    }

    /// Queue `message` for a single connection. Returns `false` when it is gone.
    pub fn send_to(&self, id: &ConnectionId, message: ServerMessage) -> bool {
        self.push(id, Outbound::Event(message))
    }

    /// Ask the writer of `id` to close the socket.
    pub fn close(&self, id: &ConnectionId) {
        self.push(id, Outbound::Close);
    }

    /// Attach a connection to the broadcast group of `session_id`.
    pub fn join_group(&self, session_id: &SessionId, id: ConnectionId) {
        self.groups
            .entry(session_id.clone())
            .or_default()
            .insert(id);
    }

    /// Connections in the session's broadcast group.
    pub fn group_members(&self, session_id: &SessionId) -> Vec<ConnectionId> {
        self.groups
            .get(session_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Queue `message` for every member of the group, returning how many were reached.
    pub fn broadcast_to_group(&self, session_id: &SessionId, message: &ServerMessage) -> usize {
        self.group_members(session_id)
            .iter()
            .filter(|id| self.send_to(id, message.clone()))
            .count()
    }

    /// Remove the whole group, returning its former members.
    pub fn dissolve_group(&self, session_id: &SessionId) -> Vec<ConnectionId> {
        self.groups
            .remove(session_id)
            .map(|(_, members)| members.into_iter().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::ws::MatchedPayload;

    fn matched(id: &str) -> ServerMessage {
        ServerMessage::Matched(MatchedPayload {
            session_id: id.into(),
        })
    }

    #[test]
    fn group_broadcast_reaches_every_member() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx_a) = ConnectionHandle::open();
        let (b, mut rx_b) = ConnectionHandle::open();
        let (c, mut rx_c) = ConnectionHandle::open();
        let session: SessionId = "1".into();
        for handle in [&a, &b, &c] {
            registry.register(handle.clone());
        }
        registry.join_group(&session, a.id);
        registry.join_group(&session, b.id);

        assert_eq!(registry.broadcast_to_group(&session, &matched("1")), 2);
        assert_eq!(rx_a.try_recv().unwrap(), Outbound::Event(matched("1")));
        assert_eq!(rx_b.try_recv().unwrap(), Outbound::Event(matched("1")));
        assert!(rx_c.try_recv().is_err());
    }

    #[test]
    fn send_to_unknown_or_closed_connection_fails() {
        let registry = ConnectionRegistry::new();
        let (a, rx_a) = ConnectionHandle::open();
        assert!(!registry.send_to(&a.id, matched("1")));

        registry.register(a.clone());
        drop(rx_a);
        assert!(!registry.send_to(&a.id, matched("1")));
    }

    #[test]
    fn dissolving_group_returns_members_once() {
        let registry = ConnectionRegistry::new();
        let session: SessionId = "3".into();
        let (a, _rx) = ConnectionHandle::open();
        registry.join_group(&session, a.id);
        registry.join_group(&session, a.id);

        assert_eq!(registry.dissolve_group(&session), vec![a.id]);
        assert!(registry.dissolve_group(&session).is_empty());
        assert!(registry.group_members(&session).is_empty());
    }
}
