//! Scrim lobby binary entrypoint wiring the lobby store, chat gateway, REST and SSE layers.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scrim_lobby::{
    config::{AppConfig, StorageBackend},
    dao::lobby_store::{LobbyStore, memory::{DEFAULT_SWEEP_INTERVAL, MemoryLobbyStore}},
    gateway::ChatGateway,
    routes,
    state::{
        AppState, SharedState,
        clock::{Clock, SystemClock},
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let store = build_store(&config, clock.clone()).await?;
    let gateway = build_gateway(&config)?;
    if gateway.is_none() {
        warn!("no Discord token configured; lobby messages will not be rendered");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app_state = AppState::new(&config, store, clock, gateway);
    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Build the configured lobby store. MongoDB connection retries with backoff before giving up.
async fn build_store(config: &AppConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Arc<dyn LobbyStore>> {
    match config.storage {
        StorageBackend::Memory => {
            info!(ttl_secs = config.lobby_ttl.as_secs(), "using in-memory lobby store");
            Ok(memory_store(config, clock))
        }
        StorageBackend::Mongo => connect_mongo(config, clock).await,
    }
}

fn memory_store(config: &AppConfig, clock: Arc<dyn Clock>) -> Arc<dyn LobbyStore> {
    let store = MemoryLobbyStore::new(config.lobby_ttl, clock);
    // The task ends on its own once the store is dropped.
    store.spawn_sweeper(DEFAULT_SWEEP_INTERVAL);
    Arc::new(store)
}

#[cfg(feature = "mongo-store")]
async fn connect_mongo(config: &AppConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Arc<dyn LobbyStore>> {
    use scrim_lobby::dao::lobby_store::mongodb::{MongoConfig, MongoLobbyStore};

    let mongo = MongoConfig::from_uri(&config.mongo_uri, config.mongo_db.as_deref())
        .await
        .context("parsing MongoDB configuration")?;
    let store = MongoLobbyStore::connect(mongo, config.lobby_ttl, clock)
        .await
        .context("connecting to MongoDB")?;
    info!(ttl_secs = config.lobby_ttl.as_secs(), "connected to MongoDB lobby store");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "mongo-store"))]
async fn connect_mongo(config: &AppConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Arc<dyn LobbyStore>> {
    warn!("built without the `mongo-store` feature; falling back to the in-memory lobby store");
    Ok(memory_store(config, clock))
}

#[cfg(feature = "discord-gateway")]
fn build_gateway(config: &AppConfig) -> anyhow::Result<Option<Arc<dyn ChatGateway>>> {
    use scrim_lobby::gateway::discord::{DiscordConfig, DiscordGateway};

    let Some(token) = config.discord_token.as_deref() else {
        return Ok(None);
    };
    let gateway = DiscordGateway::new(DiscordConfig::new(token, Some(config.discord_api_base.as_str())))
        .context("building Discord client")?;
    Ok(Some(Arc::new(gateway)))
}

#[cfg(not(feature = "discord-gateway"))]
fn build_gateway(config: &AppConfig) -> anyhow::Result<Option<Arc<dyn ChatGateway>>> {
    if config.discord_token.is_some() {
        warn!("built without the `discord-gateway` feature; ignoring DISCORD_TOKEN");
    }
    Ok(None)
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
