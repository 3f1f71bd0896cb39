use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{QuestionSource, QuestionSourceError};
use crate::state::game::{Language, Question, Topic};

const INDEX_NAME: &str = "questions";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "_source")]
    source: QuestionDocument,
}

#[derive(Debug, Deserialize)]
struct QuestionDocument {
    question_text: String,
    options: Vec<String>,
    answer: String,
}

/// Question source backed by an Elasticsearch `questions` index.
///
/// Questions are filtered on topic and language and ordered by a random score so each session
/// gets a different draw.
#[derive(Clone)]
pub struct ElasticQuestionSource {
    client: Client,
    base_url: Arc<str>,
}

impl ElasticQuestionSource {
    /// Source querying the index at `base_url`.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, QuestionSourceError> {
        let client = Client::builder()
            .build()
            .map_err(|source| QuestionSourceError::Backend {
                message: "failed to build Elasticsearch client".into(),
                source: Box::new(source),
            })?;
        Ok(Self {
            client,
            base_url: Arc::from(base_url.as_ref().trim_end_matches('/')),
        })
    }

    /// Read the cluster address from `ELASTIC_URL`.
    pub fn from_env() -> Option<Result<Self, QuestionSourceError>> {
        std::env::var("ELASTIC_URL").ok().map(Self::new)
    }

    async fn search(
        &self,
        topic: Topic,
        language: Language,
        count: usize,
    ) -> Result<Vec<Question>, QuestionSourceError> {
        let query = json!({
            "size": count,
            "query": {
                "bool": {
                    "filter": [
                        { "terms": { "topics": [topic.as_str()] } },
                        { "term": { "language": language.as_str() } }
                    ],
                    "must": {
                        "function_score": { "functions": [ { "random_score": {} } ] }
                    }
                }
            }
        });

        let url = format!("{}/{}/_search", self.base_url, INDEX_NAME);
        let response = self
            .client
            .post(&url)
            .json(&query)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| QuestionSourceError::Backend {
                message: format!("search request to `{url}` failed"),
                source: Box::new(source),
            })?;

        let payload =
            response
                .json::<SearchResponse>()
                .await
                .map_err(|source| QuestionSourceError::Backend {
                    message: "failed to decode search response".into(),
                    source: Box::new(source),
                })?;

        let questions: Vec<Question> = payload
            .hits
            .hits
            .into_iter()
            .map(|hit| Question::new(hit.source.question_text, hit.source.options, hit.source.answer))
            .collect();

        if questions.len() < count {
            return Err(QuestionSourceError::NotEnough {
                topic,
                language,
                requested: count,
                available: questions.len(),
            });
        }
        Ok(questions)
    }
}

impl QuestionSource for ElasticQuestionSource {
    fn fetch(
        &self,
        topic: Topic,
        language: Language,
        count: usize,
    ) -> BoxFuture<'static, Result<Vec<Question>, QuestionSourceError>> {
        let source = self.clone();
        Box::pin(async move { source.search(topic, language, count).await })
    }
}
