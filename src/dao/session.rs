use std::sync::Arc;

use crate::{
    dao::{
        session_store::SessionStore,
        storage::{StorageError, StorageResult},
    },
    state::game::{Session, SessionId},
};

/// Store key holding the last numeric session id handed out.
pub const LAST_SESSION_ID_KEY: &str = "last_game_id_key";

/// Data Access Object encapsulating the serialized form of session records.
#[derive(Clone)]
pub struct SessionRepository {
    store: Arc<dyn SessionStore>,
}

impl SessionRepository {
    /// Repository over `store`.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Load and decode the record stored under `id`.
    pub async fn find(&self, id: &str) -> StorageResult<Option<Session>> {
        let Some(raw) = self.store.get(id).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Codec {
                key: id.to_owned(),
                source,
            })
    }

    /// Overwrite the whole record of `session`.
    pub async fn save(&self, session: &Session) -> StorageResult<()> {
        let raw = serde_json::to_string(session).map_err(|source| StorageError::Codec {
            key: session.id.clone(),
            source,
        })?;
        self.store.set(&session.id, raw).await
    }

    /// Reserve the next unused session id and record it as the last allocated one.
    ///
    /// Callers must serialize allocations within the process; ids already present in the store
    /// (written by another process) are skipped.
    pub async fn allocate_id(&self) -> StorageResult<SessionId> {
        let last = match self.store.get(LAST_SESSION_ID_KEY).await? {
            Some(raw) => raw.trim().parse::<u64>().unwrap_or(0),
            None => 0,
        };

        let mut candidate = last + 1;
        while self.store.exists(&candidate.to_string()).await? {
            candidate += 1;
        }

        self.store
            .set(LAST_SESSION_ID_KEY, candidate.to_string())
            .await?;
        Ok(candidate.to_string())
    }
}
