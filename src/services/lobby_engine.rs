//! State machine and invariant enforcement for lobbies.
//!
//! Every mutation re-reads the record, validates it against the aggregate and
//! writes it back while holding a per-lobby async mutex, so concurrent calls on
//! the same id observe each other's writes. Locks are dropped from the table
//! once nobody waits on them.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    dao::{lobby_store::LobbyStore, models::LobbyRecord},
    error::LobbyError,
    state::{
        clock::Clock,
        hub::{ChangeKind, LobbyHub},
        lobby::{Lobby, LobbyPatch, NewLobby},
    },
};

/// Lobby operations over an expiring store.
pub struct LobbyEngine {
    store: Arc<dyn LobbyStore>,
    clock: Arc<dyn Clock>,
    hub: Arc<LobbyHub>,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl LobbyEngine {
    pub fn new(store: Arc<dyn LobbyStore>, clock: Arc<dyn Clock>, hub: Arc<LobbyHub>) -> Self {
        Self {
            store,
            clock,
            hub,
            locks: DashMap::new(),
        }
    }

    /// Store backing this engine.
    pub fn store(&self) -> &Arc<dyn LobbyStore> {
        &self.store
    }

    /// Hub receiving every committed change.
    pub fn hub(&self) -> &Arc<LobbyHub> {
        &self.hub
    }

    /// Open a pending lobby with its creator joined.
    pub async fn create(&self, new: NewLobby) -> Result<Lobby, LobbyError> {
        let lobby = Lobby::open(new, self.clock.now());
        if let Err(err) = self.store.put(LobbyRecord::from(&lobby)).await {
            error!(guild_id = lobby.guild_id(), error = %err, "failed to persist new lobby");
            return Err(err.into());
        }

        info!(
            lobby_id = %lobby.id(),
            guild_id = lobby.guild_id(),
            creator_id = lobby.creator_id(),
            "lobby created"
        );
        self.hub.publish(ChangeKind::Created, &lobby);
        Ok(lobby)
    }

    /// Fetch a live lobby. Absent and expired lobbies both yield `None`.
    pub async fn get(&self, id: Uuid) -> Result<Option<Lobby>, LobbyError> {
        match self.store.get(id).await? {
            Some(record) => Ok(Some(Lobby::try_from(record)?)),
            None => Ok(None),
        }
    }

    /// Live lobbies of a guild, newest first. Unreadable records are skipped.
    pub async fn list_by_guild(&self, guild_id: &str) -> Result<Vec<Lobby>, LobbyError> {
        let records = self.store.list_by_guild(guild_id.to_owned()).await?;
        Ok(records
            .into_iter()
            .filter_map(|record| {
                let id = record.id;
                Lobby::try_from(record)
                    .inspect_err(|err| warn!(lobby_id = %id, error = %err, "skipping unreadable lobby"))
                    .ok()
            })
            .collect())
    }

    /// Resolve the lobby rendered as `message_id`.
    pub async fn find_by_message(&self, message_id: &str) -> Result<Option<Lobby>, LobbyError> {
        match self.store.find_by_message(message_id.to_owned()).await? {
            Some(record) => Ok(Some(Lobby::try_from(record)?)),
            None => Ok(None),
        }
    }

    /// Remove a lobby. Returns whether it existed.
    pub async fn delete(&self, id: Uuid) -> Result<bool, LobbyError> {
        let lock = self.lock_for(id);
        let result = {
            let _guard = lock.lock().await;
            self.delete_locked(id).await
        };
        drop(lock);
        self.release(id);

        match &result {
            Ok(true) => info!(lobby_id = %id, "lobby deleted"),
            Ok(false) => debug!(lobby_id = %id, "lobby already gone"),
            Err(err) => log_failure(id, "delete", err),
        }
        result
    }

    async fn delete_locked(&self, id: Uuid) -> Result<bool, LobbyError> {
        let guild_id = self.store.get(id).await?.map(|record| record.guild_id);
        let existed = self.store.delete(id).await?;
        if let Some(guild_id) = guild_id.filter(|_| existed) {
            self.hub.publish_deleted(id, &guild_id);
        }
        Ok(existed)
    }

    pub async fn add_participant(&self, id: Uuid, user_id: &str) -> Result<Lobby, LobbyError> {
        self.mutate(id, "join", |lobby, now| lobby.add_participant(user_id, now))
            .await
    }

    pub async fn remove_participant(&self, id: Uuid, user_id: &str) -> Result<Lobby, LobbyError> {
        self.mutate(id, "leave", |lobby, now| {
            lobby.remove_participant(user_id, now)
        })
        .await
    }

    /// Activate a pending lobby whose scheduled time, if any, has passed.
    pub async fn start(&self, id: Uuid) -> Result<Lobby, LobbyError> {
        self.mutate(id, "start", |lobby, now| lobby.start(now)).await
    }

    pub async fn cancel(&self, id: Uuid) -> Result<Lobby, LobbyError> {
        self.mutate(id, "cancel", |lobby, now| lobby.cancel(now)).await
    }

    /// Finish an active lobby. Exposed over HTTP only; chat interactions never complete a lobby.
    pub async fn complete(&self, id: Uuid) -> Result<Lobby, LobbyError> {
        self.mutate(id, "complete", |lobby, now| lobby.complete(now))
            .await
    }

    /// Edit title, schedule or capacity of a pending lobby.
    pub async fn update(&self, id: Uuid, patch: LobbyPatch) -> Result<Lobby, LobbyError> {
        self.mutate(id, "update", |lobby, now| lobby.apply_patch(patch, now))
            .await
    }

    /// Record the rendered message of a lobby, once.
    pub async fn bind_message(&self, id: Uuid, message_id: &str) -> Result<Lobby, LobbyError> {
        self.mutate(id, "bind", |lobby, now| lobby.bind_message(message_id, now))
            .await
    }

    async fn mutate<F>(&self, id: Uuid, operation: &'static str, apply: F) -> Result<Lobby, LobbyError>
    where
        F: FnOnce(&mut Lobby, time::OffsetDateTime) -> Result<(), LobbyError>,
    {
        let lock = self.lock_for(id);
        let result = {
            let _guard = lock.lock().await;
            self.mutate_locked(id, apply).await
        };
        drop(lock);
        self.release(id);

        match &result {
            Ok(lobby) => info!(
                lobby_id = %id,
                guild_id = lobby.guild_id(),
                operation,
                status = %lobby.status(),
                participants = lobby.participant_count(),
                "lobby updated"
            ),
            Err(err) => log_failure(id, operation, err),
        }
        result
    }

    async fn mutate_locked<F>(&self, id: Uuid, apply: F) -> Result<Lobby, LobbyError>
    where
        F: FnOnce(&mut Lobby, time::OffsetDateTime) -> Result<(), LobbyError>,
    {
        let Some(record) = self.store.get(id).await? else {
            return Err(LobbyError::NotFound(id));
        };
        let mut lobby = Lobby::try_from(record)?;

        apply(&mut lobby, self.clock.now())?;

        self.store.put(LobbyRecord::from(&lobby)).await?;
        self.hub.publish(ChangeKind::Updated, &lobby);
        Ok(lobby)
    }

    fn lock_for(&self, id: Uuid) -> Arc<Mutex<()>> {
        Arc::clone(&self.locks.entry(id).or_default())
    }

    fn release(&self, id: Uuid) {
        self.locks
            .remove_if(&id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

fn log_failure(id: Uuid, operation: &'static str, err: &LobbyError) {
    match err {
        LobbyError::StoreUnavailable(source) => {
            error!(lobby_id = %id, operation, error = %source, "lobby store failure")
        }
        _ => debug!(lobby_id = %id, operation, reason = %err, "lobby operation refused"),
    }
}
