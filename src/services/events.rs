use tracing::{debug, warn};

use crate::{
    dto::ws::{MatchedPayload, ServerMessage},
    state::{
        SharedState,
        connections::ConnectionId,
        game::{Session, SessionId},
    },
};

/// Tell both sides of a fresh pairing which session to join.
pub fn notify_matched(state: &SharedState, connections: &[ConnectionId], session_id: &SessionId) {
    let message = ServerMessage::Matched(MatchedPayload {
        session_id: session_id.clone(),
    });
    for connection in connections {
        send_event(state, connection, message.clone());
    }
}

/// Broadcast the question the group should now answer.
pub fn broadcast_new_question(state: &SharedState, session: &Session) {
    send_group_event(state, &session.id, ServerMessage::NewQuestion(session.clone()));
}

/// Bring a single connection up to date with the question being played.
pub fn send_new_question(state: &SharedState, connection: &ConnectionId, session: &Session) {
    send_event(state, connection, ServerMessage::NewQuestion(session.clone()));
}

/// Broadcast the session right after an answer was recorded.
pub fn broadcast_new_answer(state: &SharedState, session: &Session) {
    send_group_event(state, &session.id, ServerMessage::NewAnswer(session.clone()));
}

/// Broadcast the final state of a finished session.
pub fn broadcast_game_over(state: &SharedState, session: &Session) {
    send_group_event(state, &session.id, ServerMessage::GameOver(session.clone()));
}

/// Tell the players left behind that their session was abandoned.
pub fn notify_disconnect(state: &SharedState, connections: &[ConnectionId], session: &Session) {
    let message = ServerMessage::Disconnect(session.clone());
    for connection in connections {
        send_event(state, connection, message.clone());
    }
}

fn send_event(state: &SharedState, connection: &ConnectionId, message: ServerMessage) {
    let event = message.event_name();
    if !state.connections().send_to(connection, message) {
        warn!(%connection, event, "failed to deliver event; connection is gone");
    }
}

fn send_group_event(state: &SharedState, session_id: &SessionId, message: ServerMessage) {
    let reached = state.connections().broadcast_to_group(session_id, &message);
    debug!(session = %session_id, event = message.event_name(), reached, "broadcast session event");
}
