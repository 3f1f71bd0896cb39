use std::sync::Arc;

use futures::future::BoxFuture;
use mongodb::{Client, Collection, Database, bson::doc};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::MongoValueDocument,
};
use crate::dao::{session_store::SessionStore, storage::StorageResult};

const VALUE_COLLECTION_NAME: &str = "kv";

/// Key/value store backed by a MongoDB collection.
#[derive(Clone)]
pub struct MongoSessionStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoSessionStore {
    /// Establish a connection to MongoDB.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        Ok(Self { inner })
    }

    async fn collection(&self) -> Collection<MongoValueDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoValueDocument>(VALUE_COLLECTION_NAME)
    }

    async fn load(&self, key: String) -> MongoResult<Option<String>> {
        let collection = self.collection().await;
        let document = collection
            .find_one(doc! { "_id": key.as_str() })
            .await
            .map_err(|source| MongoDaoError::Load {
                key: key.clone(),
                source,
            })?;
        Ok(document.map(|document| document.value))
    }

    async fn save(&self, key: String, value: String) -> MongoResult<()> {
        let collection = self.collection().await;
        let document = MongoValueDocument {
            key: key.clone(),
            value,
        };
        collection
            .replace_one(doc! { "_id": key.as_str() }, &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Save { key, source })?;
        Ok(())
    }

    async fn contains(&self, key: String) -> MongoResult<bool> {
        let collection = self.collection().await;
        let count = collection
            .count_documents(doc! { "_id": key.as_str() })
            .await
            .map_err(|source| MongoDaoError::Load { key, source })?;
        Ok(count > 0)
    }
}

impl SessionStore for MongoSessionStore {
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let store = self.clone();
        let key = key.to_owned();
        Box::pin(async move { store.load(key).await.map_err(Into::into) })
    }

    fn set(&self, key: &str, value: String) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let key = key.to_owned();
        Box::pin(async move { store.save(key, value).await.map_err(Into::into) })
    }

    fn exists(&self, key: &str) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        let key = key.to_owned();
        Box::pin(async move { store.contains(key).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
