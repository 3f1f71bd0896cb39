use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use dashmap::DashMap;
use futures::future::BoxFuture;

use crate::dao::{
    session_store::SessionStore,
    storage::{StorageError, StorageResult},
};

/// Process-local store backed by a concurrent map.
///
/// Used by the `memory` backend and by tests; writes can be switched off to exercise the
/// storage failure paths.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    entries: Arc<DashMap<String, String>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemorySessionStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set` fail (or succeed again with `false`).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Read a value synchronously, bypassing the async contract.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let value = self.peek(key);
        Box::pin(async move { Ok(value) })
    }

    fn set(&self, key: &str, value: String) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let key = key.to_owned();
        Box::pin(async move {
            if store.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::unavailable(
                    format!("write to `{key}` rejected"),
                    io::Error::other("memory store is read-only"),
                ));
            }
            store.entries.insert(key, value);
            Ok(())
        })
    }

    fn exists(&self, key: &str) -> BoxFuture<'static, StorageResult<bool>> {
        let exists = self.entries.contains_key(key);
        Box::pin(async move { Ok(exists) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
