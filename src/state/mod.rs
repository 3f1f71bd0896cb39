/// Live connections and broadcast groups.
pub mod connections;
/// Session domain model.
pub mod game;
/// Per-key async locks.
pub mod locks;
/// Matchmaking lines.
pub mod matchmaking;
/// Session locks and connection membership.
pub mod sessions;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::{
        question_source::QuestionSource, session::SessionRepository, session_store::SessionStore,
    },
    error::ServiceError,
};

use self::{
    connections::ConnectionRegistry, matchmaking::MatchmakingPool, sessions::SessionRegistry,
};

/// Shared handle to [`AppState`].
pub type SharedState = Arc<AppState>;

/// Central application state: live connections, matchmaking lines, session coordination and
/// the storage handles.
pub struct AppState {
    config: AppConfig,
    session_store: RwLock<Option<Arc<dyn SessionStore>>>,
    questions: Arc<dyn QuestionSource>,
    connections: ConnectionRegistry,
    pool: MatchmakingPool,
    sessions: SessionRegistry,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a session store is installed.
    pub fn new(config: AppConfig, questions: Arc<dyn QuestionSource>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            session_store: RwLock::new(None),
            questions,
            connections: ConnectionRegistry::new(),
            pool: MatchmakingPool::new(),
            sessions: SessionRegistry::new(),
            degraded: degraded_tx,
        })
    }

    /// Construct a state with a store already installed.
    pub fn with_store(
        config: AppConfig,
        store: Arc<dyn SessionStore>,
        questions: Arc<dyn QuestionSource>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(false);
        Arc::new(Self {
            config,
            session_store: RwLock::new(Some(store)),
            questions,
            connections: ConnectionRegistry::new(),
            pool: MatchmakingPool::new(),
            sessions: SessionRegistry::new(),
            degraded: degraded_tx,
        })
    }

    /// Loaded configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Question source used for new sessions.
    pub fn questions(&self) -> Arc<dyn QuestionSource> {
        self.questions.clone()
    }

    /// Registry of live player sockets and session broadcast groups.
    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// Matchmaking lines.
    pub fn pool(&self) -> &MatchmakingPool {
        &self.pool
    }

    /// Per-session locks and connection membership.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Obtain a handle to the current session store, if one is installed.
    pub async fn session_store(&self) -> Option<Arc<dyn SessionStore>> {
        let guard = self.session_store.read().await;
        guard.as_ref().cloned()
    }

    /// Session store handle, or [`ServiceError::Degraded`] when none is installed.
    pub async fn require_session_store(&self) -> Result<Arc<dyn SessionStore>, ServiceError> {
        self.session_store().await.ok_or(ServiceError::Degraded)
    }

    /// Repository over the installed store.
    pub async fn repository(&self) -> Result<SessionRepository, ServiceError> {
        Ok(SessionRepository::new(self.require_session_store().await?))
    }

    /// Install a new session store implementation and leave degraded mode.
    pub async fn set_session_store(&self, store: Arc<dyn SessionStore>) {
        {
            let mut guard = self.session_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current session store and enter degraded mode.
    pub async fn clear_session_store(&self) {
        {
            let mut guard = self.session_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }
}
