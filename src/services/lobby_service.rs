//! Lobby operations followed by a re-render of the bound chat message.

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::LobbyError,
    gateway::GatewayError,
    services::{
        lobby_engine::LobbyEngine,
        reconciler::{Reconciler, render_view},
    },
    state::lobby::{Lobby, LobbyPatch, NewLobby},
};

/// Why the first render of a new lobby did not end with a bound message.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("failed to bind rendered message: {0}")]
    Bind(#[from] LobbyError),
}

/// Engine calls paired with presentation updates.
#[derive(Clone)]
pub struct LobbyService {
    engine: Arc<LobbyEngine>,
    reconciler: Reconciler,
}

impl LobbyService {
    pub fn new(engine: Arc<LobbyEngine>, reconciler: Reconciler) -> Self {
        Self { engine, reconciler }
    }

    pub fn engine(&self) -> &Arc<LobbyEngine> {
        &self.engine
    }

    /// Create a lobby and post its message. A failed first render leaves the lobby unbound.
    pub async fn create(&self, new: NewLobby) -> Result<Lobby, LobbyError> {
        let lobby = self.engine.create(new).await?;
        match self.render_new(&lobby).await {
            Ok(bound) => Ok(bound),
            Err(err) => {
                warn!(lobby_id = %lobby.id(), error = %err, "initial lobby render failed");
                Ok(lobby)
            }
        }
    }

    /// Post the first message of `lobby` and bind it.
    ///
    /// Without a gateway this returns the lobby unchanged.
    pub async fn render_new(&self, lobby: &Lobby) -> Result<Lobby, RenderError> {
        let Some(message_id) = self.reconciler.publish(lobby).await? else {
            return Ok(lobby.clone());
        };
        let bound = self.engine.bind_message(lobby.id(), &message_id).await?;
        // Mutations committed while posting skipped their refresh.
        if render_view(&bound) != render_view(lobby) {
            self.reconciler.refresh(&bound).await;
        }
        Ok(bound)
    }

    pub async fn get(&self, id: Uuid) -> Result<Lobby, LobbyError> {
        self.engine.get(id).await?.ok_or(LobbyError::NotFound(id))
    }

    pub async fn list_by_guild(&self, guild_id: &str) -> Result<Vec<Lobby>, LobbyError> {
        self.engine.list_by_guild(guild_id).await
    }

    pub async fn find_by_message(&self, message_id: &str) -> Result<Option<Lobby>, LobbyError> {
        self.engine.find_by_message(message_id).await
    }

    /// Delete a lobby, failing with `NotFound` when it was already gone.
    pub async fn delete(&self, id: Uuid) -> Result<(), LobbyError> {
        if self.engine.delete(id).await? {
            Ok(())
        } else {
            Err(LobbyError::NotFound(id))
        }
    }

    pub async fn add_participant(&self, id: Uuid, user_id: &str) -> Result<Lobby, LobbyError> {
        self.refreshed(self.engine.add_participant(id, user_id).await)
            .await
    }

    pub async fn remove_participant(&self, id: Uuid, user_id: &str) -> Result<Lobby, LobbyError> {
        self.refreshed(self.engine.remove_participant(id, user_id).await)
            .await
    }

    pub async fn start(&self, id: Uuid) -> Result<Lobby, LobbyError> {
        self.refreshed(self.engine.start(id).await).await
    }

    pub async fn cancel(&self, id: Uuid) -> Result<Lobby, LobbyError> {
        self.refreshed(self.engine.cancel(id).await).await
    }

    pub async fn complete(&self, id: Uuid) -> Result<Lobby, LobbyError> {
        self.refreshed(self.engine.complete(id).await).await
    }

    pub async fn update(&self, id: Uuid, patch: LobbyPatch) -> Result<Lobby, LobbyError> {
        self.refreshed(self.engine.update(id, patch).await).await
    }

    async fn refreshed(&self, result: Result<Lobby, LobbyError>) -> Result<Lobby, LobbyError> {
        let lobby = result?;
        self.reconciler.refresh(&lobby).await;
        Ok(lobby)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::{
        dao::lobby_store::{DEFAULT_LOBBY_TTL, memory::MemoryLobbyStore},
        gateway::{
            ChatGateway,
            testing::{GatewayCall, RecordingGateway},
        },
        state::{clock::ManualClock, hub::LobbyHub, state_machine::LobbyStatus},
    };

    fn service(gateway: &Arc<RecordingGateway>) -> LobbyService {
        let clock = Arc::new(ManualClock::new(datetime!(2026-06-20 12:00 UTC)));
        let store = Arc::new(MemoryLobbyStore::new(DEFAULT_LOBBY_TTL, clock.clone()));
        let engine = LobbyEngine::new(store, clock, Arc::new(LobbyHub::new(8)));
        let gateway = Arc::clone(gateway) as Arc<dyn ChatGateway>;
        LobbyService::new(Arc::new(engine), Reconciler::new(Some(gateway)))
    }

    fn new_lobby() -> NewLobby {
        NewLobby {
            guild_id: "g".into(),
            channel_id: "c".into(),
            creator_id: "owner".into(),
            title: "Wingman".into(),
            scheduled_start_time: None,
            max_participants: None,
        }
    }

    #[tokio::test]
    async fn create_binds_the_posted_message() {
        let gateway = Arc::new(RecordingGateway::new());
        let service = service(&gateway);

        let lobby = service.create(new_lobby()).await.unwrap();
        assert_eq!(lobby.message_id(), Some("msg-1"));

        let found = service.find_by_message("msg-1").await.unwrap().unwrap();
        assert_eq!(found.id(), lobby.id());
        assert_eq!(gateway.calls().len(), 1);
    }

    #[tokio::test]
    async fn join_landing_before_bind_is_rendered() {
        let gateway = Arc::new(RecordingGateway::new());
        let service = service(&gateway);
        let lobby = service.engine().create(new_lobby()).await.unwrap();

        let engine = Arc::clone(service.engine());
        let id = lobby.id();
        gateway.run_after_next_post(Box::pin(async move {
            engine.add_participant(id, "early").await.unwrap();
        }));

        let bound = service.render_new(&lobby).await.unwrap();
        assert_eq!(bound.participant_count(), 2);
        assert!(matches!(
            gateway.calls().as_slice(),
            [GatewayCall::Post { .. }, GatewayCall::Edit { message_id, .. }] if message_id == "msg-1"
        ));
        assert_eq!(gateway.last_view_of("msg-1"), Some(render_view(&bound)));
    }

    #[tokio::test]
    async fn complete_rerenders_the_bound_message() {
        let gateway = Arc::new(RecordingGateway::new());
        let service = service(&gateway);
        let lobby = service.create(new_lobby()).await.unwrap();
        service.start(lobby.id()).await.unwrap();

        let completed = service.complete(lobby.id()).await.unwrap();
        assert_eq!(completed.status(), LobbyStatus::Completed);
        assert_eq!(gateway.last_view_of("msg-1"), Some(render_view(&completed)));
    }

    #[tokio::test]
    async fn failed_first_render_leaves_lobby_unbound() {
        let gateway = Arc::new(RecordingGateway::new());
        gateway.set_failing(true);
        let service = service(&gateway);

        let lobby = service.create(new_lobby()).await.unwrap();
        assert_eq!(lobby.message_id(), None);
        assert_eq!(service.get(lobby.id()).await.unwrap().message_id(), None);
    }

    #[tokio::test]
    async fn mutations_rerender_and_survive_render_failures() {
        let gateway = Arc::new(RecordingGateway::new());
        let service = service(&gateway);
        let lobby = service.create(new_lobby()).await.unwrap();

        service.add_participant(lobby.id(), "mate").await.unwrap();
        let view = gateway.last_view_of("msg-1").unwrap();
        assert!(view.embed.fields.iter().any(|f| f.value == "<@owner>, <@mate>"));

        gateway.set_failing(true);
        let cancelled = service.cancel(lobby.id()).await.unwrap();
        assert_eq!(cancelled.status(), LobbyStatus::Cancelled);
        assert_eq!(
            service.get(lobby.id()).await.unwrap().status(),
            LobbyStatus::Cancelled
        );
        assert_eq!(
            gateway
                .calls()
                .iter()
                .filter(|call| matches!(call, GatewayCall::Edit { .. }))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn deleting_twice_reports_not_found() {
        let gateway = Arc::new(RecordingGateway::new());
        let service = service(&gateway);
        let lobby = service.create(new_lobby()).await.unwrap();

        service.delete(lobby.id()).await.unwrap();
        assert!(matches!(
            service.delete(lobby.id()).await,
            Err(LobbyError::NotFound(_))
        ));
        assert!(matches!(
            service.get(lobby.id()).await,
            Err(LobbyError::NotFound(_))
        ));
    }
}
