pub mod clock;
pub mod hub;
pub mod lobby;
pub mod state_machine;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    dao::lobby_store::LobbyStore,
    gateway::ChatGateway,
    services::{
        interaction_router::InteractionRouter, lobby_engine::LobbyEngine,
        lobby_service::LobbyService, reconciler::Reconciler,
    },
};

use self::{clock::Clock, hub::LobbyHub};

pub type SharedState = Arc<AppState>;

/// Capacity of the change broadcast feeding SSE subscribers.
const HUB_CAPACITY: usize = 64;

/// Central application state shared by every route.
pub struct AppState {
    lobbies: LobbyService,
    interactions: InteractionRouter,
}

impl AppState {
    /// Wire the engine, reconciler and router over the given backends.
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn LobbyStore>,
        clock: Arc<dyn Clock>,
        gateway: Option<Arc<dyn ChatGateway>>,
    ) -> SharedState {
        let hub = Arc::new(LobbyHub::new(HUB_CAPACITY));
        let engine = Arc::new(LobbyEngine::new(store, clock, hub));
        let lobbies = LobbyService::new(engine, Reconciler::new(gateway));
        let interactions = InteractionRouter::new(lobbies.clone(), config.player_bounds);

        Arc::new(Self {
            lobbies,
            interactions,
        })
    }

    /// Lobby operations used by the HTTP routes.
    pub fn lobbies(&self) -> &LobbyService {
        &self.lobbies
    }

    /// Router for chat gateway events.
    pub fn interactions(&self) -> &InteractionRouter {
        &self.interactions
    }

    /// Broadcast hub of committed lobby changes.
    pub fn hub(&self) -> &Arc<LobbyHub> {
        self.lobbies.engine().hub()
    }

    pub fn store(&self) -> &Arc<dyn LobbyStore> {
        self.lobbies.engine().store()
    }
}
