use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::validation::{validate_player_key, validate_room_code, validate_session_id},
    state::game::{Language, QueueKey, Session, SessionId, Topic},
};

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
/// Request to enter the matchmaking line for a topic and language.
pub struct JoinRequest {
    /// Topic to play.
    pub topic: Topic,
    /// Language of the questions.
    pub language: Language,
    /// Pre-shared code restricting pairing to players who know it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_room_code"))]
    pub room_code: Option<String>,
}

impl JoinRequest {
    /// Line this request waits in.
    pub fn queue_key(&self) -> QueueKey {
        QueueKey::new(self.topic, self.language, self.room_code.clone())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
/// Request to attach the connection to a session it was matched into.
pub struct JoinSessionRequest {
    /// Session announced in the `matched` event.
    #[validate(custom(function = "validate_session_id"))]
    pub session_id: String,
    /// Ten-digit phone number identifying the player.
    #[validate(custom(function = "validate_player_key"))]
    pub player_key: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
/// Answer submitted for the question currently being played.
pub struct AnswerRequest {
    /// Session the answer belongs to.
    #[validate(custom(function = "validate_session_id"))]
    pub session_id: String,
    /// Zero-based index of the answered question.
    pub question_index: usize,
    /// Option picked by the player.
    #[validate(length(min = 1))]
    pub selected_option: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Messages accepted from player WebSocket clients.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Enter a matchmaking line.
    Join(JoinRequest),
    /// Attach to a matched session.
    JoinSession(JoinSessionRequest),
    /// Answer the current question.
    Answer(AnswerRequest),
}

/// Reasons an inbound frame is rejected before reaching any handler.
#[derive(Debug, Error)]
pub enum InboundError {
    /// The frame is not a known message.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// A field failed validation.
    #[error("invalid message: {0}")]
    Invalid(#[from] ValidationErrors),
}

impl ClientMessage {
    /// Parse a text frame and validate its payload.
    pub fn from_json_str(text: &str) -> Result<Self, InboundError> {
        let message: ClientMessage = serde_json::from_str(text)?;
        match &message {
            ClientMessage::Join(request) => request.validate()?,
            ClientMessage::JoinSession(request) => request.validate()?,
            ClientMessage::Answer(request) => request.validate()?,
        }
        Ok(message)
    }

    /// Message type name, used for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Join(_) => "join",
            ClientMessage::JoinSession(_) => "join_session",
            ClientMessage::Answer(_) => "answer",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// Sent to both connections of a fresh pairing.
pub struct MatchedPayload {
    /// Session both players should join.
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
/// Events pushed to player connections.
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A partner was found.
    Matched(MatchedPayload),
    /// A new round started.
    NewQuestion(Session),
    /// A player answered the current question.
    NewAnswer(Session),
    /// The last round closed.
    GameOver(Session),
    /// The partner left the session.
    Disconnect(Session),
}

impl ServerMessage {
    /// Event name as it appears on the wire.
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::Matched(_) => "matched",
            ServerMessage::NewQuestion(_) => "new_question",
            ServerMessage::NewAnswer(_) => "new_answer",
            ServerMessage::GameOver(_) => "game_over",
            ServerMessage::Disconnect(_) => "disconnect",
        }
    }
}
