//! Sharequiz binary entrypoint wiring the WebSocket, health and documentation layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::{Context, bail};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sharequiz_back::{
    config::AppConfig,
    dao::{
        question_source::{QuestionSource, bank::QuestionBank},
        session_store::{SessionStore, memory::MemorySessionStore},
        storage::StorageError,
    },
    routes,
    services::storage_supervisor,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let questions = build_question_source(&config);
    let backend = StoreBackend::from_env()?;

    let app_state = AppState::new(config, questions);
    spawn_storage_supervisor(app_state.clone(), backend);

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, backend = ?backend, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Session store selected through `STORE_BACKEND`.
#[derive(Debug, Clone, Copy)]
enum StoreBackend {
    Memory,
    #[cfg(feature = "couch-store")]
    Couch,
    #[cfg(feature = "mongo-store")]
    Mongo,
}

impl StoreBackend {
    fn from_env() -> anyhow::Result<Self> {
        let raw = env::var("STORE_BACKEND").unwrap_or_else(|_| "memory".into());
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "memory" => Ok(Self::Memory),
            #[cfg(feature = "couch-store")]
            "couch" | "couchdb" => Ok(Self::Couch),
            #[cfg(feature = "mongo-store")]
            "mongo" | "mongodb" => Ok(Self::Mongo),
            other => bail!("unsupported STORE_BACKEND `{other}`"),
        }
    }
}

/// Run the storage supervisor for the selected backend in the background.
fn spawn_storage_supervisor(state: SharedState, backend: StoreBackend) {
    match backend {
        StoreBackend::Memory => {
            let store = MemorySessionStore::new();
            tokio::spawn(storage_supervisor::run(state, move || {
                let store: Arc<dyn SessionStore> = Arc::new(store.clone());
                async move { Ok::<_, StorageError>(store) }
            }));
        }
        #[cfg(feature = "couch-store")]
        StoreBackend::Couch => {
            tokio::spawn(storage_supervisor::run(state, connect_couch));
        }
        #[cfg(feature = "mongo-store")]
        StoreBackend::Mongo => {
            tokio::spawn(storage_supervisor::run(state, connect_mongo));
        }
    }
}

#[cfg(feature = "couch-store")]
async fn connect_couch() -> Result<Arc<dyn SessionStore>, StorageError> {
    use sharequiz_back::dao::session_store::couchdb::{CouchConfig, CouchSessionStore};

    let config = CouchConfig::from_env()?;
    let store = CouchSessionStore::connect(config).await?;
    Ok(Arc::new(store))
}

#[cfg(feature = "mongo-store")]
async fn connect_mongo() -> Result<Arc<dyn SessionStore>, StorageError> {
    use sharequiz_back::dao::session_store::mongodb::{MongoConfig, MongoSessionStore};

    let config = MongoConfig::from_env().await?;
    let store = MongoSessionStore::connect(config).await?;
    Ok(Arc::new(store))
}

/// Pick the question source: Elasticsearch when configured, the JSON bank otherwise.
fn build_question_source(config: &AppConfig) -> Arc<dyn QuestionSource> {
    #[cfg(feature = "elastic-questions")]
    {
        use sharequiz_back::dao::question_source::elastic::ElasticQuestionSource;

        match ElasticQuestionSource::from_env() {
            Some(Ok(source)) => {
                info!("using Elasticsearch question source");
                return Arc::new(source);
            }
            Some(Err(err)) => {
                warn!(error = %err, "failed to configure Elasticsearch; using the question bank")
            }
            None => {}
        }
    }

    match QuestionBank::from_path(&config.question_bank_path) {
        Ok(bank) => {
            info!(
                path = %config.question_bank_path.display(),
                questions = bank.len(),
                "loaded question bank"
            );
            Arc::new(bank)
        }
        Err(err) => {
            warn!(error = %err, "question bank unavailable; pairings will fail until it is provided");
            Arc::new(QuestionBank::default())
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
