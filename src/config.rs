//! Application-level configuration loading: game rules and the question bank location.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SHAREQUIZ_CONFIG_PATH";
/// Default location of the question bank used when no search backend is configured.
const DEFAULT_QUESTION_BANK_PATH: &str = "config/questions.json";

const DEFAULT_QUESTIONS_PER_SESSION: usize = 10;
const DEFAULT_PLAYERS_PER_SESSION: usize = 2;
const DEFAULT_FULL_CREDIT_POINTS: u32 = 10;
const DEFAULT_INTER_QUESTION_DELAY_MS: u64 = 2_000;
const DEFAULT_SESSION_CREATION_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Number of questions asked in every session.
    pub questions_per_session: usize,
    /// Number of players a session waits for before the first question.
    pub players_per_session: usize,
    /// Points awarded for a correct answer.
    pub full_credit_points: u32,
    /// Pause between the end of a round and the next question.
    pub inter_question_delay: Duration,
    /// How many times session creation is retried before a pairing fails.
    pub session_creation_attempts: u32,
    /// JSON file the question bank is loaded from.
    pub question_bank_path: PathBuf,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        questions = app_config.questions_per_session,
                        players = app_config.players_per_session,
                        "loaded game configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    questions_per_session: Option<usize>,
    players_per_session: Option<usize>,
    full_credit_points: Option<u32>,
    inter_question_delay_ms: Option<u64>,
    session_creation_attempts: Option<u32>,
    question_bank_path: Option<PathBuf>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            questions_per_session: value
                .questions_per_session
                .filter(|count| *count > 0)
                .unwrap_or(DEFAULT_QUESTIONS_PER_SESSION),
            players_per_session: value
                .players_per_session
                .filter(|count| *count > 0)
                .unwrap_or(DEFAULT_PLAYERS_PER_SESSION),
            full_credit_points: value
                .full_credit_points
                .unwrap_or(DEFAULT_FULL_CREDIT_POINTS),
            inter_question_delay: Duration::from_millis(
                value
                    .inter_question_delay_ms
                    .unwrap_or(DEFAULT_INTER_QUESTION_DELAY_MS),
            ),
            session_creation_attempts: value
                .session_creation_attempts
                .filter(|attempts| *attempts > 0)
                .unwrap_or(DEFAULT_SESSION_CREATION_ATTEMPTS),
            question_bank_path: value
                .question_bank_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_QUESTION_BANK_PATH)),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
