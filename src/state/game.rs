use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

/// Identifier of a persisted game session (decimal string allocated from the store counter).
pub type SessionId = String;

/// Quiz topics a matchmaking line can be opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Topic {
    /// Indian general knowledge.
    India,
    /// Hindi cinema.
    Bollywood,
    /// Science.
    Science,
    /// Technology.
    Technology,
    /// World affairs.
    World,
}

/// Languages questions are available in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Language {
    /// English.
    English,
    /// Hindi.
    Hindi,
    /// Bengali.
    Bengali,
    /// Tamil.
    Tamil,
    /// Odia.
    Odia,
}

impl Topic {
    /// Lowercase name used when querying a question index.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::India => "india",
            Topic::Bollywood => "bollywood",
            Topic::Science => "science",
            Topic::Technology => "technology",
            Topic::World => "world",
        }
    }
}

impl Language {
    /// Lowercase name used when querying a question index.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Hindi => "hindi",
            Language::Bengali => "bengali",
            Language::Tamil => "tamil",
            Language::Odia => "odia",
        }
    }
}

/// Identity of one matchmaking line. Two connections pair only when their keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueKey {
    /// Topic of the line.
    pub topic: Topic,
    /// Language of the line.
    pub language: Language,
    /// Private room, if any.
    pub room_code: Option<String>,
}

impl QueueKey {
    /// Key for a topic, language and optional room code.
    pub fn new(topic: Topic, language: Language, room_code: Option<String>) -> Self {
        Self {
            topic,
            language,
            room_code,
        }
    }
}

impl fmt::Display for QueueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.topic.as_str(), self.language.as_str())?;
        if let Some(code) = &self.room_code {
            write!(f, "_{code}")?;
        }
        Ok(())
    }
}

/// Lifecycle of a session. `Disconnected` and `Finished` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum SessionStatus {
    /// Players are joining or answering.
    Active,
    /// A player left before the end.
    Disconnected,
    /// Every question was played.
    Finished,
}

impl SessionStatus {
    /// Whether the status can no longer change.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Active)
    }
}

/// Participant of a session, keyed by phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Phone number the player joined with.
    pub id: String,
    /// Running total over all answered questions.
    pub score: u32,
    /// Option picked for the most recent answer.
    pub selected: Option<String>,
}

impl Player {
    /// Fresh player with no score.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            score: 0,
            selected: None,
        }
    }
}

/// One trivia question together with the answers submitted for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Text shown to players.
    pub question_text: String,
    /// Possible answers.
    pub options: Vec<String>,
    /// The correct option.
    pub answer: String,
    /// Answers of the round this question is asked in, keyed by player.
    #[serde(default)]
    pub player_answers: IndexMap<String, String>,
}

impl Question {
    /// Question with an empty answer map.
    pub fn new(
        question_text: impl Into<String>,
        options: Vec<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            question_text: question_text.into(),
            options,
            answer: answer.into(),
            player_answers: IndexMap::new(),
        }
    }
}

/// Canonical persisted record of a two-player match.
///
/// The record is always read, modified and written back as a whole while the session lock is
/// held; no field is ever written on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Store key of the record.
    pub id: SessionId,
    /// Language of the questions.
    pub language: Language,
    /// Topic of the questions.
    pub topic: Topic,
    /// Number of rounds.
    pub max_questions: usize,
    /// Players needed before the first round.
    pub number_of_players: usize,
    /// Zero-based cursor into `questions`. Reaches `max_questions` once the game is over.
    pub question_number: usize,
    /// Joined players, in join order.
    pub players: IndexMap<String, Player>,
    /// Lifecycle state.
    pub status: SessionStatus,
    /// Creation time, Unix seconds.
    pub created_timestamp: i64,
    /// Questions in play order.
    pub questions: Vec<Question>,
    /// Points per question and player; the value for question `n` lives at index `n`.
    pub scores: IndexMap<String, Vec<u32>>,
}

/// Outcome of recording an answer inside [`Session::record_answer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// The answer was stored; `round_complete` tells whether every player has now answered.
    Recorded {
        /// Points awarded.
        points: u32,
        /// Whether every player has now answered.
        round_complete: bool,
    },
    /// The session is no longer accepting answers.
    Inactive,
    /// Not every player has joined yet, so no question is open.
    NotStarted,
    /// The answer targets another question than the current one.
    WrongQuestion {
        /// Question currently open.
        current: usize,
    },
    /// The player already answered the current question.
    AlreadyAnswered,
    /// The player never joined this session.
    UnknownPlayer,
    /// The option is not one of the current question's options.
    UnknownOption,
}

impl Session {
    /// Build the initial record for a freshly paired match.
    pub fn new(
        id: SessionId,
        topic: Topic,
        language: Language,
        max_questions: usize,
        number_of_players: usize,
        questions: Vec<Question>,
    ) -> Self {
        Self {
            id,
            language,
            topic,
            max_questions,
            number_of_players,
            question_number: 0,
            players: IndexMap::new(),
            status: SessionStatus::Active,
            created_timestamp: OffsetDateTime::now_utc().unix_timestamp(),
            questions,
            scores: IndexMap::new(),
        }
    }

    /// Register a player, returning `false` when the key already joined.
    pub fn add_player(&mut self, player_key: &str) -> bool {
        if self.players.contains_key(player_key) {
            return false;
        }
        self.players
            .insert(player_key.to_owned(), Player::new(player_key));
        self.scores
            .insert(player_key.to_owned(), vec![0; self.max_questions + 1]);
        true
    }

    /// Whether the configured number of players has joined.
    pub fn is_full(&self) -> bool {
        self.players.len() >= self.number_of_players
    }

    /// Question the players are currently answering, if the game is still running.
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.question_number)
    }

    /// Validate and store an answer for the current question.
    ///
    /// Nothing is mutated unless [`AnswerOutcome::Recorded`] is returned.
    pub fn record_answer(
        &mut self,
        player_key: &str,
        question_index: usize,
        selected_option: &str,
        full_credit: u32,
    ) -> AnswerOutcome {
        if self.status != SessionStatus::Active {
            return AnswerOutcome::Inactive;
        }
        if !self.is_full() {
            return AnswerOutcome::NotStarted;
        }
        if question_index != self.question_number {
            return AnswerOutcome::WrongQuestion {
                current: self.question_number,
            };
        }
        if !self.players.contains_key(player_key) {
            return AnswerOutcome::UnknownPlayer;
        }
        let question_number = self.question_number;
        let Some(question) = self.questions.get_mut(question_number) else {
            return AnswerOutcome::Inactive;
        };
        if question.player_answers.contains_key(player_key) {
            return AnswerOutcome::AlreadyAnswered;
        }
        if !question.options.iter().any(|option| option == selected_option) {
            return AnswerOutcome::UnknownOption;
        }

        let points = if selected_option == question.answer {
            full_credit
        } else {
            0
        };
        question
            .player_answers
            .insert(player_key.to_owned(), selected_option.to_owned());
        let round_complete = question.player_answers.len() >= self.number_of_players;

        if let Some(slot) = self
            .scores
            .get_mut(player_key)
            .and_then(|scores| scores.get_mut(question_number))
        {
            *slot = points;
        }
        if let Some(player) = self.players.get_mut(player_key) {
            player.score += points;
            player.selected = Some(selected_option.to_owned());
        }

        AnswerOutcome::Recorded {
            points,
            round_complete,
        }
    }

    /// Whether closing the current round ends the game.
    pub fn is_last_question(&self) -> bool {
        self.question_number + 1 >= self.max_questions
    }

    /// Close the final round: move the cursor past the last question and finish the game.
    pub fn finish(&mut self) {
        self.question_number = self.max_questions;
        self.status = SessionStatus::Finished;
    }

    /// Move to the next question, starting its round with an empty answer map.
    pub fn advance(&mut self) {
        self.question_number += 1;
        if let Some(question) = self.questions.get_mut(self.question_number) {
            question.player_answers.clear();
        }
    }

    /// Mark the session as abandoned. Returns `false` when it already reached a terminal state.
    pub fn mark_disconnected(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = SessionStatus::Disconnected;
        true
    }
}
