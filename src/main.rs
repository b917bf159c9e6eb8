//! Club Pick Back binary entrypoint wiring REST, SSE and the selection store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use club_pick_back::{
    AppConfig,
    dao::{
        selection_store::{MemorySelectionStore, SelectionStore},
        storage::StorageError,
    },
    routes,
    services::{sse_service, storage_supervisor},
    state::{AppState, SessionRegistry, SharedState},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Selects the store backend; `memory` keeps everything in process.
const STORE_ENV: &str = "CLUB_PICK_STORE";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let sessions = match config.session_file() {
        Some(path) => SessionRegistry::load(path).await,
        None => SessionRegistry::in_memory(),
    };
    info!(sessions = sessions.len(), "session registry ready");
    let session_flusher = sessions.spawn_flusher();

    let app_state = AppState::new(config, sessions);
    sse_service::spawn_status_forwarder(app_state.clone());
    spawn_store_supervisor(app_state.clone()).await?;

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state.clone());

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    session_flusher.abort();
    app_state.sessions().flush().await;
    Ok(())
}

/// Start the background task that owns the store connection.
async fn spawn_store_supervisor(state: SharedState) -> anyhow::Result<()> {
    let backend = env::var(STORE_ENV).unwrap_or_default();
    if backend.eq_ignore_ascii_case("memory") {
        info!("using the in-memory selection store");
        let store = MemorySelectionStore::new();
        tokio::spawn(storage_supervisor::run(state, move || {
            let store = store.clone();
            async move { Ok::<_, StorageError>(Arc::new(store) as Arc<dyn SelectionStore>) }
        }));
        return Ok(());
    }

    spawn_mongo_supervisor(state).await
}

#[cfg(feature = "mongo-store")]
async fn spawn_mongo_supervisor(state: SharedState) -> anyhow::Result<()> {
    use club_pick_back::dao::selection_store::mongodb::{MongoConfig, MongoSelectionStore};

    let config = MongoConfig::from_env()
        .await
        .context("loading MongoDB configuration")?;
    info!(database = %config.database_name, "using the MongoDB selection store");

    tokio::spawn(storage_supervisor::run(state, move || {
        let config = config.clone();
        async move {
            MongoSelectionStore::connect(config)
                .await
                .map(|store| Arc::new(store) as Arc<dyn SelectionStore>)
                .map_err(StorageError::from)
        }
    }));
    Ok(())
}

#[cfg(not(feature = "mongo-store"))]
async fn spawn_mongo_supervisor(_state: SharedState) -> anyhow::Result<()> {
    anyhow::bail!("built without the `mongo-store` feature; set {STORE_ENV}=memory")
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
                tracing::warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
