/// Question sources used when a session is created.
pub mod question_source;
/// Typed access to session records on top of the key/value store.
pub mod session;
/// Key/value backends holding session records.
pub mod session_store;
/// Storage abstraction layer for database operations.
pub mod storage;
