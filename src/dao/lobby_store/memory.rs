//! Process-local lobby store with key expiry, mirroring a key-value server.
//!
//! Records are kept as serialized JSON so the store behaves like a remote
//! backend: callers never share memory with what is stored.

use std::{collections::HashSet, sync::Arc, time::Duration};

use dashmap::DashMap;
use futures::future::BoxFuture;
use time::OffsetDateTime;
use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::debug;
use uuid::Uuid;

use crate::{
    dao::{
        lobby_store::{LobbyStore, sort_newest_first},
        models::LobbyRecord,
        storage::{StorageError, StorageResult},
    },
    state::clock::Clock,
};

/// How often [`MemoryLobbyStore::spawn_sweeper`] is run from `main`.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct MemoryLobbyStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    lobbies: DashMap<Uuid, StoredLobby>,
    guilds: DashMap<String, HashSet<Uuid>>,
    messages: DashMap<String, Uuid>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

struct StoredLobby {
    payload: String,
    guild_id: String,
    message_id: Option<String>,
    expires_at: OffsetDateTime,
}

impl MemoryLobbyStore {
    /// Create an empty store whose records live for `ttl` after each write.
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                lobbies: DashMap::new(),
                guilds: DashMap::new(),
                messages: DashMap::new(),
                ttl,
                clock,
            }),
        }
    }

    /// Drop every expired record together with its index entries.
    pub fn purge_expired(&self) -> usize {
        self.inner.purge_expired()
    }

    /// Purge expired records every `period` until the store is dropped.
    pub fn spawn_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let inner = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                let purged = inner.purge_expired();
                if purged > 0 {
                    debug!(purged, "swept expired lobby records");
                }
            }
        })
    }
}

impl MemoryInner {
    fn put(&self, lobby: LobbyRecord) -> StorageResult<()> {
        let payload = serde_json::to_string(&lobby)
            .map_err(|source| StorageError::corrupt(lobby.id.to_string(), source))?;
        let expires_at = self.clock.now() + self.ttl;
        let message_id = lobby.bound_message().map(str::to_owned);

        if let Some(message_id) = &message_id {
            self.messages.insert(message_id.clone(), lobby.id);
        }
        self.guilds
            .entry(lobby.guild_id.clone())
            .or_default()
            .insert(lobby.id);
        self.lobbies.insert(
            lobby.id,
            StoredLobby {
                payload,
                guild_id: lobby.guild_id,
                message_id,
                expires_at,
            },
        );
        Ok(())
    }

    fn get(&self, id: Uuid) -> StorageResult<Option<LobbyRecord>> {
        let now = self.clock.now();
        let payload = {
            let Some(entry) = self.lobbies.get(&id) else {
                return Ok(None);
            };
            if entry.expires_at <= now {
                None
            } else {
                Some(entry.payload.clone())
            }
        };

        match payload {
            Some(payload) => serde_json::from_str(&payload)
                .map(Some)
                .map_err(|source| StorageError::corrupt(id.to_string(), source)),
            None => {
                self.lobbies
                    .remove_if(&id, |_, stored| stored.expires_at <= now);
                debug!(lobby_id = %id, "lobby record expired");
                Ok(None)
            }
        }
    }

    fn list_by_guild(&self, guild_id: &str) -> StorageResult<Vec<LobbyRecord>> {
        let ids: Vec<Uuid> = match self.guilds.get(guild_id) {
            Some(set) => set.iter().copied().collect(),
            None => return Ok(Vec::new()),
        };

        let mut records = Vec::with_capacity(ids.len());
        let mut dangling = Vec::new();
        for id in ids {
            match self.get(id)? {
                Some(record) => records.push(record),
                None => dangling.push(id),
            }
        }

        if !dangling.is_empty() {
            if let Some(mut set) = self.guilds.get_mut(guild_id) {
                for id in &dangling {
                    set.remove(id);
                }
            }
        }

        sort_newest_first(&mut records);
        Ok(records)
    }

    fn find_by_message(&self, message_id: &str) -> StorageResult<Option<LobbyRecord>> {
        let Some(id) = self.messages.get(message_id).map(|entry| *entry) else {
            return Ok(None);
        };

        let record = self.get(id)?;
        if record.is_none() {
            self.messages.remove_if(message_id, |_, lobby_id| *lobby_id == id);
        }
        Ok(record)
    }

    fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut expired = Vec::new();
        self.lobbies.retain(|id, stored| {
            if stored.expires_at > now {
                return true;
            }
            expired.push((*id, stored.guild_id.clone(), stored.message_id.take()));
            false
        });

        for (id, guild_id, message_id) in &expired {
            if let Some(mut set) = self.guilds.get_mut(guild_id) {
                set.remove(id);
            }
            if let Some(message_id) = message_id {
                self.messages.remove_if(message_id, |_, lobby_id| lobby_id == id);
            }
        }
        if !expired.is_empty() {
            self.guilds.retain(|_, set| !set.is_empty());
        }
        expired.len()
    }

    fn delete(&self, id: Uuid) -> StorageResult<bool> {
        let now = self.clock.now();
        let Some((_, stored)) = self.lobbies.remove(&id) else {
            return Ok(false);
        };

        if let Some(mut set) = self.guilds.get_mut(&stored.guild_id) {
            set.remove(&id);
        }
        if let Some(message_id) = &stored.message_id {
            self.messages.remove_if(message_id, |_, lobby_id| *lobby_id == id);
        }

        Ok(stored.expires_at > now)
    }
}

impl LobbyStore for MemoryLobbyStore {
    fn put(&self, lobby: LobbyRecord) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.put(lobby) })
    }

    fn get(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<LobbyRecord>>> {
        let store = self.clone();
        Box::pin(async move { store.inner.get(id) })
    }

    fn list_by_guild(&self, guild_id: String) -> BoxFuture<'static, StorageResult<Vec<LobbyRecord>>> {
        let store = self.clone();
        Box::pin(async move { store.inner.list_by_guild(&guild_id) })
    }

    fn find_by_message(
        &self,
        message_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<LobbyRecord>>> {
        let store = self.clone();
        Box::pin(async move { store.inner.find_by_message(&message_id) })
    }

    fn delete(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.inner.delete(id) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
