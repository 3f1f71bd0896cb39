/// CouchDB backend.
#[cfg(feature = "couch-store")]
pub mod couchdb;
/// In-process backend.
pub mod memory;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Key/value persistence used for session records and the id counter.
///
/// Single-key writes must be atomic; no multi-key transactions are expected.
pub trait SessionStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<String>>>;
    /// Overwrite the value stored under `key`.
    fn set(&self, key: &str, value: String) -> BoxFuture<'static, StorageResult<()>>;
    /// Whether a value is stored under `key`.
    fn exists(&self, key: &str) -> BoxFuture<'static, StorageResult<bool>>;
    /// Probe the backend.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Attempt to restore a lost connection in place.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
