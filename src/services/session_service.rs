use tracing::{debug, info, warn};

use crate::{
    dao::{session::SessionRepository, storage::StorageError},
    dto::ws::{AnswerRequest, JoinSessionRequest},
    error::ServiceError,
    services::events,
    state::{
        SharedState,
        connections::ConnectionId,
        game::{AnswerOutcome, QueueKey, Session, SessionId, SessionStatus},
        sessions::Membership,
    },
};

/// Create and persist a session for a freshly paired line, retrying a bounded number of times.
///
/// Every failure, whether from the question source or the store, ends as
/// [`ServiceError::PairingFailed`] once the attempts are exhausted.
pub async fn create_session(state: &SharedState, key: &QueueKey) -> Result<Session, ServiceError> {
    let attempts = state.config().session_creation_attempts;
    let mut last_error = None;

    for attempt in 1..=attempts {
        match try_create_session(state, key).await {
            Ok(session) => {
                info!(session = %session.id, queue = %key, attempt, "session created");
                return Ok(session);
            }
            Err(err) => {
                warn!(queue = %key, attempt, error = %err, "session creation attempt failed");
                last_error = Some(err);
            }
        }
    }

    let reason = last_error
        .map(|err| err.to_string())
        .unwrap_or_else(|| "no attempt made".into());
    Err(ServiceError::PairingFailed(format!(
        "could not create a session for `{key}` after {attempts} attempt(s): {reason}"
    )))
}

async fn try_create_session(state: &SharedState, key: &QueueKey) -> Result<Session, ServiceError> {
    let config = state.config();
    let repository = state.repository().await?;
    let questions = state
        .questions()
        .fetch(key.topic, key.language, config.questions_per_session)
        .await?;

    let _gate = state.sessions().allocation_gate().await;
    let id = repository.allocate_id().await?;
    let session = Session::new(
        id,
        key.topic,
        key.language,
        config.questions_per_session,
        config.players_per_session,
        questions,
    );
    repository.save(&session).await?;
    Ok(session)
}

/// Attach `connection` to a session as `player_key`.
///
/// The first question is broadcast once the join fills the player quota. A player joining again
/// with a known key only gets the current question sent back.
pub async fn join_session(
    state: &SharedState,
    connection: ConnectionId,
    request: JoinSessionRequest,
) -> Result<(), ServiceError> {
    let JoinSessionRequest {
        session_id,
        player_key,
    } = request;
    let conflicting = state.sessions().membership(&connection).filter(|current| {
        current.session_id != session_id || current.player_key != player_key
    });
    if let Some(current) = conflicting {
        return Err(ServiceError::Validation(format!(
            "connection already plays as `{}` in session `{}`",
            current.player_key, current.session_id
        )));
    }

    let attached = {
        let _guard = state.sessions().lock(&session_id).await;
        attach_player(state, connection, &session_id, &player_key).await
    };
    let (session, added) = match attached {
        Ok(attached) => attached,
        Err(err) => {
            state.sessions().release_lock(&session_id);
            return Err(err);
        }
    };

    info!(session = %session_id, player = %player_key, %connection, added, "player joined session");

    if session.is_full() {
        if added {
            events::broadcast_new_question(state, &session);
        } else {
            events::send_new_question(state, &connection, &session);
        }
    }
    Ok(())
}

/// Add the player to the record and attach the connection. Must run under the session lock.
async fn attach_player(
    state: &SharedState,
    connection: ConnectionId,
    session_id: &SessionId,
    player_key: &str,
) -> Result<(Session, bool), ServiceError> {
    let repository = state.repository().await?;
    let mut session = load_session(&repository, session_id).await?;

    if session.status.is_terminal() {
        return Err(ServiceError::SessionUnavailable(format!(
            "session `{session_id}` is {:?}",
            session.status
        )));
    }
    if !session.players.contains_key(player_key) && session.is_full() {
        return Err(ServiceError::SessionUnavailable(format!(
            "session `{session_id}` already has {} player(s)",
            session.number_of_players
        )));
    }

    let added = session.add_player(player_key);
    if added {
        repository.save(&session).await?;
    }

    state.connections().join_group(session_id, connection);
    state.sessions().attach(
        connection,
        Membership {
            session_id: session_id.clone(),
            player_key: player_key.to_owned(),
        },
    );
    Ok((session, added))
}

/// Record the answer of the player behind `connection` and close the round when complete.
///
/// Stale or duplicate answers are rejected with [`ServiceError::StaleSubmission`] and leave the
/// record untouched.
pub async fn submit_answer(
    state: &SharedState,
    connection: ConnectionId,
    request: AnswerRequest,
) -> Result<(), ServiceError> {
    let membership = state
        .sessions()
        .membership(&connection)
        .filter(|membership| membership.session_id == request.session_id)
        .ok_or_else(|| {
            ServiceError::Validation(format!(
                "connection has not joined session `{}`",
                request.session_id
            ))
        })?;
    let session_id = membership.session_id;
    let config = state.config();
    let repository = state.repository().await?;

    let closed_question = {
        let _guard = state.sessions().lock(&session_id).await;
        let mut session = load_session(&repository, &session_id).await?;

        let outcome = session.record_answer(
            &membership.player_key,
            request.question_index,
            &request.selected_option,
            config.full_credit_points,
        );
        let round_complete = match outcome {
            AnswerOutcome::Recorded {
                points,
                round_complete,
            } => {
                debug!(
                    session = %session_id,
                    player = %membership.player_key,
                    question = request.question_index,
                    points,
                    "answer recorded"
                );
                round_complete
            }
            AnswerOutcome::Inactive => {
                return Err(ServiceError::StaleSubmission(format!(
                    "session `{session_id}` is no longer active"
                )));
            }
            AnswerOutcome::NotStarted => {
                return Err(ServiceError::StaleSubmission(format!(
                    "session `{session_id}` is still waiting for players"
                )));
            }
            AnswerOutcome::WrongQuestion { current } => {
                return Err(ServiceError::StaleSubmission(format!(
                    "question {} is not current (current is {current})",
                    request.question_index
                )));
            }
            AnswerOutcome::AlreadyAnswered => {
                return Err(ServiceError::StaleSubmission(format!(
                    "player `{}` already answered question {}",
                    membership.player_key, request.question_index
                )));
            }
            AnswerOutcome::UnknownPlayer => {
                return Err(ServiceError::Validation(format!(
                    "player `{}` is not part of session `{session_id}`",
                    membership.player_key
                )));
            }
            AnswerOutcome::UnknownOption => {
                return Err(ServiceError::Validation(format!(
                    "`{}` is not an option of question {}",
                    request.selected_option, request.question_index
                )));
            }
        };

        repository.save(&session).await?;
        events::broadcast_new_answer(state, &session);

        if !round_complete {
            return Ok(());
        }

        if session.is_last_question() {
            session.finish();
            repository.save(&session).await?;
            info!(session = %session_id, "session finished");
            events::broadcast_game_over(state, &session);
            None
        } else {
            Some(session.question_number)
        }
    };

    match closed_question {
        Some(question_number) => {
            tokio::time::sleep(config.inter_question_delay).await;
            advance_question(state, &repository, &session_id, question_number).await
        }
        None => {
            state.sessions().release_lock(&session_id);
            Ok(())
        }
    }
}

/// Move a session past `closed_question` unless it changed while the lock was released.
async fn advance_question(
    state: &SharedState,
    repository: &SessionRepository,
    session_id: &SessionId,
    closed_question: usize,
) -> Result<(), ServiceError> {
    let _guard = state.sessions().lock(session_id).await;
    let mut session = load_session(repository, session_id).await?;

    if session.status != SessionStatus::Active || session.question_number != closed_question {
        debug!(
            session = %session_id,
            status = ?session.status,
            question = session.question_number,
            "session changed during the inter-question delay; not advancing"
        );
        return Ok(());
    }

    session.advance();
    repository.save(&session).await?;
    debug!(session = %session_id, question = session.question_number, "advanced to next question");
    events::broadcast_new_question(state, &session);
    Ok(())
}

/// Tear down the session membership of a closing connection.
///
/// Every connection of the session is detached, and an unfinished session is marked
/// `Disconnected` with the remaining players notified.
pub async fn disconnect(state: &SharedState, connection: ConnectionId) -> Result<(), ServiceError> {
    let Some(membership) = state.sessions().membership(&connection) else {
        return Ok(());
    };
    let session_id = membership.session_id;

    let result = {
        let _guard = state.sessions().lock(&session_id).await;
        abandon_session(state, connection, &session_id, &membership.player_key).await
    };
    state.sessions().release_lock(&session_id);
    result
}

/// Detach every member of the session and mark it `Disconnected`. Must run under the session
/// lock.
async fn abandon_session(
    state: &SharedState,
    connection: ConnectionId,
    session_id: &SessionId,
    player_key: &str,
) -> Result<(), ServiceError> {
    // The partner's disconnect may have detached us while we waited.
    let still_attached = state
        .sessions()
        .membership(&connection)
        .is_some_and(|current| &current.session_id == session_id);
    if !still_attached {
        return Ok(());
    }

    let members = state.connections().dissolve_group(session_id);
    state.sessions().detach_all(session_id, &members);
    state.sessions().detach(&connection);
    let remaining: Vec<ConnectionId> = members
        .into_iter()
        .filter(|member| *member != connection)
        .collect();

    let repository = state.repository().await?;
    let mut session = load_session(&repository, session_id).await?;
    if session.mark_disconnected() {
        repository.save(&session).await?;
        info!(session = %session_id, player = %player_key, "session abandoned");
        events::notify_disconnect(state, &remaining, &session);
    } else {
        debug!(
            session = %session_id,
            status = ?session.status,
            "disconnect after terminal state"
        );
    }
    Ok(())
}

async fn load_session(
    repository: &SessionRepository,
    session_id: &str,
) -> Result<Session, ServiceError> {
    match repository.find(session_id).await {
        Ok(Some(session)) => Ok(session),
        Ok(None) => Err(ServiceError::SessionUnavailable(format!(
            "session `{session_id}` not found"
        ))),
        Err(err @ StorageError::Codec { .. }) => {
            warn!(session = %session_id, error = %err, "stored session is unreadable");
            Err(ServiceError::SessionUnavailable(format!(
                "session `{session_id}` could not be decoded"
            )))
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            question_source::bank::{BankEntry, QuestionBank},
            session_store::memory::MemorySessionStore,
        },
        dto::ws::ServerMessage,
        state::{
            AppState,
            connections::{ConnectionHandle, Outbound},
            game::{Language, Topic},
        },
    };

    const ALICE: &str = "9876543210";
    const BOB: &str = "9123456780";

    fn bank(count: usize) -> QuestionBank {
        QuestionBank::new(
            (0..count)
                .map(|index| BankEntry {
                    question_text: format!("question {index}"),
                    options: vec!["right".into(), "wrong".into()],
                    answer: "right".into(),
                    topics: vec![Topic::India],
                    language: Language::English,
                })
                .collect(),
        )
    }

    fn setup(questions: usize) -> (SharedState, MemorySessionStore) {
        let store = MemorySessionStore::new();
        let config = AppConfig {
            questions_per_session: questions,
            ..AppConfig::default()
        };
        let state = AppState::with_store(config, Arc::new(store.clone()), Arc::new(bank(5)));
        (state, store)
    }

    fn connect(state: &SharedState) -> (ConnectionId, UnboundedReceiver<Outbound>) {
        let (handle, rx) = ConnectionHandle::open();
        let id = handle.id;
        state.connections().register(handle);
        (id, rx)
    }

    fn key() -> QueueKey {
        QueueKey::new(Topic::India, Language::English, None)
    }

    fn events(rx: &mut UnboundedReceiver<Outbound>) -> Vec<ServerMessage> {
        let mut events = Vec::new();
        while let Ok(outbound) = rx.try_recv() {
            if let Outbound::Event(message) = outbound {
                events.push(message);
            }
        }
        events
    }

    fn names(events: &[ServerMessage]) -> Vec<&'static str> {
        events.iter().map(ServerMessage::event_name).collect()
    }

    fn answer(session_id: &str, question_index: usize, option: &str) -> AnswerRequest {
        AnswerRequest {
            session_id: session_id.into(),
            question_index,
            selected_option: option.into(),
        }
    }

    async fn stored(state: &SharedState, id: &str) -> Session {
        state
            .repository()
            .await
            .unwrap()
            .find(id)
            .await
            .unwrap()
            .unwrap()
    }

    async fn join_as(
        state: &SharedState,
        connection: ConnectionId,
        session_id: &str,
        player: &str,
    ) -> Result<(), ServiceError> {
        join_session(
            state,
            connection,
            JoinSessionRequest {
                session_id: session_id.into(),
                player_key: player.into(),
            },
        )
        .await
    }

    async fn joined_pair(
        state: &SharedState,
    ) -> (
        String,
        (ConnectionId, UnboundedReceiver<Outbound>),
        (ConnectionId, UnboundedReceiver<Outbound>),
    ) {
        let session = create_session(state, &key()).await.unwrap();
        let (a, mut rx_a) = connect(state);
        let (b, mut rx_b) = connect(state);
        for (connection, player) in [(a, ALICE), (b, BOB)] {
            join_session(
                state,
                connection,
                JoinSessionRequest {
                    session_id: session.id.clone(),
                    player_key: player.into(),
                },
            )
            .await
            .unwrap();
        }
        events(&mut rx_a);
        events(&mut rx_b);
        (session.id, (a, rx_a), (b, rx_b))
    }

    #[tokio::test]
    async fn creating_a_session_allocates_ids_and_questions() {
        let (state, _) = setup(3);
        let first = create_session(&state, &key()).await.unwrap();
        let second = create_session(&state, &key()).await.unwrap();
        assert_eq!(first.id, "1");
        assert_eq!(second.id, "2");
        assert_eq!(first.questions.len(), 3);
        assert_eq!(first.status, SessionStatus::Active);
        assert_eq!(stored(&state, "1").await, first);
    }

    #[tokio::test]
    async fn creation_fails_as_pairing_failure_when_questions_run_short() {
        let (state, _) = setup(10);
        let err = create_session(&state, &key()).await.unwrap_err();
        assert!(matches!(err, ServiceError::PairingFailed(_)));
    }

    #[tokio::test]
    async fn creation_fails_when_the_store_rejects_writes() {
        let (state, store) = setup(2);
        store.set_fail_writes(true);
        let err = create_session(&state, &key()).await.unwrap_err();
        assert!(matches!(err, ServiceError::PairingFailed(_)));
    }

    #[tokio::test]
    async fn first_question_is_broadcast_once_quota_is_reached() {
        let (state, _) = setup(2);
        let session = create_session(&state, &key()).await.unwrap();
        let (a, mut rx_a) = connect(&state);
        let (b, mut rx_b) = connect(&state);

        join_session(
            &state,
            a,
            JoinSessionRequest {
                session_id: session.id.clone(),
                player_key: ALICE.into(),
            },
        )
        .await
        .unwrap();
        assert!(events(&mut rx_a).is_empty());

        join_session(
            &state,
            b,
            JoinSessionRequest {
                session_id: session.id.clone(),
                player_key: BOB.into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(names(&events(&mut rx_a)), vec!["new_question"]);
        assert_eq!(names(&events(&mut rx_b)), vec!["new_question"]);

        let record = stored(&state, &session.id).await;
        assert_eq!(record.players.len(), 2);
        assert_eq!(record.scores[ALICE], vec![0, 0, 0]);
    }

    #[tokio::test]
    async fn joining_missing_or_full_sessions_is_refused() {
        let (state, _) = setup(2);
        let (a, _rx) = connect(&state);
        let err = join_session(
            &state,
            a,
            JoinSessionRequest {
                session_id: "42".into(),
                player_key: ALICE.into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::SessionUnavailable(_)));

        let (session_id, _, _) = joined_pair(&state).await;
        let (c, _rx_c) = connect(&state);
        let err = join_session(
            &state,
            c,
            JoinSessionRequest {
                session_id,
                player_key: "9000000001".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::SessionUnavailable(_)));
        assert!(state.sessions().membership(&c).is_none());
    }

    #[tokio::test]
    async fn answers_before_the_quota_is_reached_are_ignored() {
        let (state, _) = setup(2);
        let session = create_session(&state, &key()).await.unwrap();
        let (a, mut rx_a) = connect(&state);
        let (b, _rx_b) = connect(&state);

        join_as(&state, a, &session.id, ALICE).await.unwrap();
        let before = stored(&state, &session.id).await;
        for question in 0..2 {
            let err = submit_answer(&state, a, answer(&session.id, question, "right"))
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::StaleSubmission(_)));
        }
        assert_eq!(stored(&state, &session.id).await, before);
        assert!(events(&mut rx_a).is_empty());

        join_as(&state, b, &session.id, BOB).await.unwrap();
        let record = stored(&state, &session.id).await;
        assert_eq!(record.status, SessionStatus::Active);
        assert_eq!(record.question_number, 0);
        assert_eq!(names(&events(&mut rx_a)), vec!["new_question"]);
    }

    #[tokio::test]
    async fn joining_a_second_session_is_refused() {
        let (state, _) = setup(2);
        let (first, (a, _rx_a), (_b, mut rx_b)) = joined_pair(&state).await;
        let second = create_session(&state, &key()).await.unwrap();

        let err = join_session(
            &state,
            a,
            JoinSessionRequest {
                session_id: second.id.clone(),
                player_key: ALICE.into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(!err.closes_connection());
        assert_eq!(state.sessions().membership(&a).unwrap().session_id, first);
        assert!(state.connections().group_members(&second.id).is_empty());
        assert!(stored(&state, &second.id).await.players.is_empty());

        disconnect(&state, a).await.unwrap();
        assert_eq!(stored(&state, &first).await.status, SessionStatus::Disconnected);
        assert_eq!(names(&events(&mut rx_b)), vec!["disconnect"]);
    }

    #[tokio::test]
    async fn failed_joins_and_disconnects_leave_no_lock_behind() {
        let (state, _) = setup(2);
        let (session_id, (a, _rx_a), _) = joined_pair(&state).await;
        assert_eq!(state.sessions().lock_count(), 1);
        state.clear_session_store().await;

        let (c, _rx_c) = connect(&state);
        let err = join_session(
            &state,
            c,
            JoinSessionRequest {
                session_id: "99".into(),
                player_key: "9000000001".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Degraded));

        let err = disconnect(&state, a).await.unwrap_err();
        assert!(matches!(err, ServiceError::Degraded));
        assert!(state.sessions().membership(&a).is_none());
        assert!(state.connections().group_members(&session_id).is_empty());
        assert_eq!(state.sessions().lock_count(), 0);
    }

    #[tokio::test]
    async fn undecodable_session_is_unavailable() {
        let (state, store) = setup(2);
        crate::dao::session_store::SessionStore::set(&store, "7", "{broken".into())
            .await
            .unwrap();
        let (a, _rx) = connect(&state);
        let err = join_session(
            &state,
            a,
            JoinSessionRequest {
                session_id: "7".into(),
                player_key: ALICE.into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::SessionUnavailable(_)));
        assert!(err.closes_connection());
    }

    #[tokio::test(start_paused = true)]
    async fn two_question_game_runs_to_completion() {
        let (state, _) = setup(2);
        let (session_id, (a, mut rx_a), (b, mut rx_b)) = joined_pair(&state).await;

        submit_answer(&state, a, answer(&session_id, 0, "right"))
            .await
            .unwrap();
        assert_eq!(names(&events(&mut rx_b)), vec!["new_answer"]);
        submit_answer(&state, b, answer(&session_id, 0, "right"))
            .await
            .unwrap();

        let record = stored(&state, &session_id).await;
        assert_eq!(record.question_number, 1);
        assert_eq!(record.scores[ALICE][0], 10);
        assert_eq!(record.scores[BOB][0], 10);
        assert!(record.questions[1].player_answers.is_empty());
        assert_eq!(
            names(&events(&mut rx_a)),
            vec!["new_answer", "new_answer", "new_question"]
        );

        submit_answer(&state, a, answer(&session_id, 1, "right"))
            .await
            .unwrap();
        submit_answer(&state, b, answer(&session_id, 1, "wrong"))
            .await
            .unwrap();

        let record = stored(&state, &session_id).await;
        assert_eq!(record.question_number, 2);
        assert_eq!(record.status, SessionStatus::Finished);
        assert_eq!(record.players[ALICE].score, 20);
        assert_eq!(record.players[BOB].score, 10);
        assert_eq!(
            names(&events(&mut rx_b)),
            vec!["new_answer", "new_question", "new_answer", "new_answer", "game_over"]
        );
        assert_eq!(state.sessions().lock_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn next_question_waits_for_the_inter_question_delay() {
        let (state, _) = setup(2);
        let (session_id, (a, _rx_a), (b, mut rx_b)) = joined_pair(&state).await;
        submit_answer(&state, a, answer(&session_id, 0, "right"))
            .await
            .unwrap();

        let started = tokio::time::Instant::now();
        submit_answer(&state, b, answer(&session_id, 0, "wrong"))
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(2_000));
        assert_eq!(names(&events(&mut rx_b)), vec!["new_answer", "new_answer", "new_question"]);
    }

    #[tokio::test]
    async fn stale_and_duplicate_answers_are_ignored() {
        let (state, _) = setup(2);
        let (session_id, (a, mut rx_a), _) = joined_pair(&state).await;
        let before = stored(&state, &session_id).await;

        let err = submit_answer(&state, a, answer(&session_id, 1, "right"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::StaleSubmission(_)));
        assert!(!err.closes_connection());
        assert_eq!(stored(&state, &session_id).await, before);
        assert!(events(&mut rx_a).is_empty());

        submit_answer(&state, a, answer(&session_id, 0, "wrong"))
            .await
            .unwrap();
        let err = submit_answer(&state, a, answer(&session_id, 0, "right"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::StaleSubmission(_)));
        let record = stored(&state, &session_id).await;
        assert_eq!(record.scores[ALICE][0], 0);
        assert_eq!(record.questions[0].player_answers[ALICE], "wrong");
    }

    #[tokio::test]
    async fn answers_from_unattached_connections_are_rejected() {
        let (state, _) = setup(2);
        let (session_id, _, _) = joined_pair(&state).await;
        let (stranger, _rx) = connect(&state);
        let err = submit_answer(&state, stranger, answer(&session_id, 0, "right"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn disconnect_marks_session_and_notifies_partner() {
        let (state, _) = setup(2);
        let (session_id, (a, _rx_a), (b, mut rx_b)) = joined_pair(&state).await;

        disconnect(&state, a).await.unwrap();

        let record = stored(&state, &session_id).await;
        assert_eq!(record.status, SessionStatus::Disconnected);
        assert_eq!(names(&events(&mut rx_b)), vec!["disconnect"]);
        assert!(state.sessions().membership(&a).is_none());
        assert!(state.sessions().membership(&b).is_none());
        assert!(state.connections().group_members(&session_id).is_empty());

        // The partner leaving afterwards is a no-op.
        disconnect(&state, b).await.unwrap();
        assert_eq!(stored(&state, &session_id).await.status, SessionStatus::Disconnected);
        assert_eq!(state.sessions().lock_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_after_finish_keeps_finished_status() {
        let mut config = AppConfig {
            questions_per_session: 1,
            ..AppConfig::default()
        };
        config.inter_question_delay = Duration::ZERO;
        let state = AppState::with_store(
            config,
            Arc::new(MemorySessionStore::new()),
            Arc::new(bank(1)),
        );
        let (session_id, (a, _rx_a), (b, mut rx_b)) = joined_pair(&state).await;
        submit_answer(&state, a, answer(&session_id, 0, "right"))
            .await
            .unwrap();
        submit_answer(&state, b, answer(&session_id, 0, "right"))
            .await
            .unwrap();
        assert_eq!(stored(&state, &session_id).await.status, SessionStatus::Finished);
        events(&mut rx_b);

        disconnect(&state, a).await.unwrap();
        assert_eq!(stored(&state, &session_id).await.status, SessionStatus::Finished);
        assert!(events(&mut rx_b).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_during_delay_prevents_advance() {
        let (state, _) = setup(2);
        let (session_id, (a, _rx_a), (b, _rx_b)) = joined_pair(&state).await;
        submit_answer(&state, a, answer(&session_id, 0, "right"))
            .await
            .unwrap();

        let closing = {
            let state = state.clone();
            let session_id = session_id.clone();
            tokio::spawn(async move {
                submit_answer(&state, b, answer(&session_id, 0, "right")).await
            })
        };
        tokio::time::sleep(Duration::from_millis(500)).await;
        disconnect(&state, a).await.unwrap();
        closing.await.unwrap().unwrap();

        let record = stored(&state, &session_id).await;
        assert_eq!(record.status, SessionStatus::Disconnected);
        assert_eq!(record.question_number, 0);
    }

    #[tokio::test]
    async fn store_failure_during_answer_surfaces_as_unavailable() {
        let (state, store) = setup(2);
        let (session_id, (a, mut rx_a), _) = joined_pair(&state).await;
        store.set_fail_writes(true);

        let err = submit_answer(&state, a, answer(&session_id, 0, "right"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));
        assert!(err.closes_connection());
        assert!(events(&mut rx_a).is_empty());
        assert!(stored(&state, &session_id).await.questions[0].player_answers.is_empty());
    }
}
