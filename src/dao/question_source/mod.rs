/// Questions sampled from a JSON file.
pub mod bank;
/// Questions queried from Elasticsearch.
#[cfg(feature = "elastic-questions")]
pub mod elastic;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::state::game::{Language, Question, Topic};

/// Failures raised while assembling the questions of a new session.
#[derive(Debug, Error)]
pub enum QuestionSourceError {
    /// The source holds fewer questions than requested.
    #[error("only {available} question(s) available for {topic:?}/{language:?}, {requested} requested")]
    NotEnough {
        /// Requested topic.
        topic: Topic,
        /// Requested language.
        language: Language,
        /// Number of questions asked for.
        requested: usize,
        /// Number of matching questions found.
        available: usize,
    },
    /// The bank file could not be read.
    #[error("failed to read question bank `{path}`")]
    Read {
        /// Bank file path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The bank file is not valid JSON.
    #[error("failed to parse question bank `{path}`")]
    Parse {
        /// Bank file path.
        path: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// The remote question backend failed.
    #[error("question backend request failed: {message}")]
    Backend {
        /// What failed.
        message: String,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Supplies the fixed, ordered question list of a session at creation time.
pub trait QuestionSource: Send + Sync {
    /// Fetch exactly `count` questions for the topic and language, each with an empty answer map.
    fn fetch(
        &self,
        topic: Topic,
        language: Language,
        count: usize,
    ) -> BoxFuture<'static, Result<Vec<Question>, QuestionSourceError>>;
}
