use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt, stream::SplitSink};
use tokio::{
    sync::mpsc::{UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    dto::ws::ClientMessage,
    error::ServiceError,
    services::{matchmaking_service, session_service},
    state::{
        SharedState,
        connections::{ConnectionHandle, ConnectionId, Outbound},
    },
};

/// Handle the full lifecycle of a single player WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (sender, mut receiver) = socket.split();
    let (handle, outbound_rx) = ConnectionHandle::open();
    let connection = handle.id;

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(run_writer(connection, sender, outbound_rx));

    state.connections().register(handle.clone());
    info!(%connection, "player connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(%connection, payload = %text, "received player message");

                let inbound = match ClientMessage::from_json_str(&text) {
                    Ok(inbound) => inbound,
                    Err(err) => {
                        warn!(%connection, error = %err, "failed to parse or validate player message");
                        continue;
                    }
                };

                let kind = inbound.kind();
                if let Err(err) = dispatch(&state, connection, inbound).await {
                    if err.closes_connection() {
                        warn!(%connection, kind, error = %err, "request failed; closing connection");
                        state.connections().close(&connection);
                        break;
                    }
                    info!(%connection, kind, error = %err, "request ignored");
                }
            }
            Ok(Message::Close(_)) => {
                info!(%connection, "player closed the connection");
                break;
            }
            Ok(Message::Binary(_)) => {
                warn!(%connection, "ignoring binary frame");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(%connection, error = %err, "websocket error");
                break;
            }
        }
    }

    release_connection(&state, connection).await;
    info!(%connection, "player disconnected");

    finalize(writer_task, handle.tx).await;
}

/// Route a parsed client message to the service owning it.
async fn dispatch(
    state: &SharedState,
    connection: ConnectionId,
    message: ClientMessage,
) -> Result<(), ServiceError> {
    match message {
        ClientMessage::Join(request) => {
            matchmaking_service::join_queue(state, connection, request).await
        }
        ClientMessage::JoinSession(request) => {
            session_service::join_session(state, connection, request).await
        }
        ClientMessage::Answer(request) => {
            session_service::submit_answer(state, connection, request).await
        }
    }
}

/// Remove every trace of `connection` from the pool, its session and the registry.
pub async fn release_connection(state: &SharedState, connection: ConnectionId) {
    if matchmaking_service::leave_queue(state, connection).await {
        debug!(%connection, "left matchmaking line");
    }
    if let Err(err) = session_service::disconnect(state, connection).await {
        warn!(%connection, error = %err, "failed to record disconnect");
    }
    state.connections().unregister(&connection);
}

/// Drain the outbound channel into the socket until it closes or a close is requested.
async fn run_writer(
    connection: ConnectionId,
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound_rx: UnboundedReceiver<Outbound>,
) {
    while let Some(outbound) = outbound_rx.recv().await {
        match outbound {
            Outbound::Event(message) => {
                let payload = match serde_json::to_string(&message) {
                    Ok(payload) => payload,
                    Err(err) => {
                        warn!(%connection, event = message.event_name(), error = %err, "failed to serialize event");
                        continue;
                    }
                };
                if sender.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            Outbound::Close => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    }
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: UnboundedSender<Outbound>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
