use std::{fs, path::Path, sync::Arc};

use futures::future::BoxFuture;
use rand::seq::IndexedRandom;
use serde::Deserialize;

use super::{QuestionSource, QuestionSourceError};
use crate::state::game::{Language, Question, Topic};

/// Question as stored in the bank file.
#[derive(Debug, Clone, Deserialize)]
pub struct BankEntry {
    /// Question shown to players.
    pub question_text: String,
    /// Possible answers.
    pub options: Vec<String>,
    /// The correct option.
    pub answer: String,
    /// Topics the question can be drawn for.
    pub topics: Vec<Topic>,
    /// Language of the text.
    pub language: Language,
}

impl BankEntry {
    fn matches(&self, topic: Topic, language: Language) -> bool {
        self.language == language && self.topics.contains(&topic)
    }
}

impl From<&BankEntry> for Question {
    fn from(entry: &BankEntry) -> Self {
        Question::new(
            entry.question_text.clone(),
            entry.options.clone(),
            entry.answer.clone(),
        )
    }
}

/// In-memory question bank; every fetch draws a fresh random sample of the matching entries.
#[derive(Clone, Default)]
pub struct QuestionBank {
    entries: Arc<Vec<BankEntry>>,
}

impl QuestionBank {
    /// Bank over in-memory entries.
    pub fn new(entries: Vec<BankEntry>) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Load a JSON array of [`BankEntry`] values from disk.
    pub fn from_path(path: &Path) -> Result<Self, QuestionSourceError> {
        let display = path.display().to_string();
        let contents = fs::read_to_string(path).map_err(|source| QuestionSourceError::Read {
            path: display.clone(),
            source,
        })?;
        let entries = serde_json::from_str::<Vec<BankEntry>>(&contents).map_err(|source| {
            QuestionSourceError::Parse {
                path: display,
                source,
            }
        })?;
        Ok(Self::new(entries))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bank holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn sample(
        &self,
        topic: Topic,
        language: Language,
        count: usize,
    ) -> Result<Vec<Question>, QuestionSourceError> {
        let candidates: Vec<&BankEntry> = self
            .entries
            .iter()
            .filter(|entry| entry.matches(topic, language))
            .collect();

        if candidates.len() < count {
            return Err(QuestionSourceError::NotEnough {
                topic,
                language,
                requested: count,
                available: candidates.len(),
            });
        }

        let mut rng = rand::rng();
        Ok(candidates
            .choose_multiple(&mut rng, count)
            .map(|entry| Question::from(*entry))
            .collect())
    }
}

impl QuestionSource for QuestionBank {
    fn fetch(
        &self,
        topic: Topic,
        language: Language,
        count: usize,
    ) -> BoxFuture<'static, Result<Vec<Question>, QuestionSourceError>> {
        let result = self.sample(topic, language, count);
        Box::pin(async move { result })
    }
}
