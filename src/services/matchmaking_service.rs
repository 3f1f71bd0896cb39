use tracing::info;

use crate::{
    dto::ws::JoinRequest,
    error::ServiceError,
    services::{events, session_service},
    state::{SharedState, connections::ConnectionId, matchmaking::JoinOutcome},
};

/// Put `connection` in the matchmaking line of the request, pairing it when someone waits.
///
/// Pairing creates the session and sends `matched` to both sides while the line is still locked,
/// so no third joiner can observe a half-made pair.
pub async fn join_queue(
    state: &SharedState,
    connection: ConnectionId,
    request: JoinRequest,
) -> Result<(), ServiceError> {
    let key = request.queue_key();

    let outcome = state
        .pool()
        .join(connection, key.clone(), |partner| {
            let state = state.clone();
            let key = key.clone();
            async move {
                let session = session_service::create_session(&state, &key).await?;
                events::notify_matched(&state, &[partner, connection], &session.id);
                Ok(session.id)
            }
        })
        .await?;

    match outcome {
        JoinOutcome::Waiting => info!(queue = %key, %connection, "waiting for an opponent"),
        JoinOutcome::Paired { partner, value } => {
            info!(queue = %key, %connection, %partner, session = %value, "players matched")
        }
    }
    Ok(())
}

/// Drop `connection` from any line it waits in.
pub async fn leave_queue(state: &SharedState, connection: ConnectionId) -> bool {
    state.pool().leave(&connection).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            question_source::bank::{BankEntry, QuestionBank},
            session_store::memory::MemorySessionStore,
        },
        dto::ws::{MatchedPayload, ServerMessage},
        state::{
            AppState,
            connections::{ConnectionHandle, Outbound},
            game::{Language, QueueKey, Topic},
        },
    };

    fn state_with_questions(count: usize) -> SharedState {
        let entries = (0..count)
            .map(|index| BankEntry {
                question_text: format!("q{index}"),
                options: vec!["a".into(), "b".into()],
                answer: "a".into(),
                topics: vec![Topic::India],
                language: Language::English,
            })
            .collect();
        let config = AppConfig {
            questions_per_session: 2,
            ..AppConfig::default()
        };
        AppState::with_store(
            config,
            Arc::new(MemorySessionStore::new()),
            Arc::new(QuestionBank::new(entries)),
        )
    }

    fn connect(state: &SharedState) -> (ConnectionId, UnboundedReceiver<Outbound>) {
        let (handle, rx) = ConnectionHandle::open();
        let id = handle.id;
        state.connections().register(handle);
        (id, rx)
    }

    fn request() -> JoinRequest {
        JoinRequest {
            topic: Topic::India,
            language: Language::English,
            room_code: None,
        }
    }

    fn matched(id: &str) -> Outbound {
        Outbound::Event(ServerMessage::Matched(MatchedPayload {
            session_id: id.into(),
        }))
    }

    #[tokio::test]
    async fn pairing_notifies_both_players_with_the_same_session() {
        let state = state_with_questions(4);
        let (a, mut rx_a) = connect(&state);
        let (b, mut rx_b) = connect(&state);

        join_queue(&state, a, request()).await.unwrap();
        assert!(rx_a.try_recv().is_err());
        join_queue(&state, b, request()).await.unwrap();

        assert_eq!(rx_a.try_recv().unwrap(), matched("1"));
        assert_eq!(rx_b.try_recv().unwrap(), matched("1"));
        let key = QueueKey::new(Topic::India, Language::English, None);
        assert!(state.pool().waiting(&key).is_empty());
    }

    #[tokio::test]
    async fn failed_creation_keeps_waiting_player_in_line() {
        let state = state_with_questions(1);
        let (a, mut rx_a) = connect(&state);
        let (b, _rx_b) = connect(&state);

        join_queue(&state, a, request()).await.unwrap();
        let err = join_queue(&state, b, request()).await.unwrap_err();
        assert!(matches!(err, ServiceError::PairingFailed(_)));
        assert!(err.closes_connection());

        let key = request().queue_key();
        assert_eq!(state.pool().waiting(&key), vec![a]);
        assert_eq!(state.pool().queue_of(&b), None);
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn leaving_the_line_prevents_pairing() {
        let state = state_with_questions(4);
        let (a, _rx_a) = connect(&state);
        let (b, mut rx_b) = connect(&state);

        join_queue(&state, a, request()).await.unwrap();
        assert!(leave_queue(&state, a).await);
        join_queue(&state, b, request()).await.unwrap();
        assert!(rx_b.try_recv().is_err());
        assert_eq!(state.pool().waiting(&request().queue_key()), vec![b]);
    }
}
