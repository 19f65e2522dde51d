use std::{sync::Arc, time::Duration};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Collection, Database, IndexModel, bson::doc, options::IndexOptions};
use tracing::warn;
use uuid::Uuid;

use super::{
    connection::{MongoConfig, establish_connection},
    error::{MongoDaoError, MongoResult},
    models::{
        MongoGuildIndexDocument, MongoLobbyDocument, MongoMessageIndexDocument, bson_time, doc_id,
        live_filter,
    },
};
use crate::{
    dao::{
        lobby_store::{LobbyStore, sort_newest_first},
        models::LobbyRecord,
        storage::StorageResult,
    },
    state::clock::Clock,
};

const LOBBY_COLLECTION_NAME: &str = "lobbies";
const GUILD_INDEX_COLLECTION_NAME: &str = "guild_lobbies";
const MESSAGE_INDEX_COLLECTION_NAME: &str = "lobby_messages";

/// Lobby store backed by MongoDB TTL collections.
#[derive(Clone)]
pub struct MongoLobbyStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    database: Database,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl MongoLobbyStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(
        config: MongoConfig,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> MongoResult<Self> {
        let (_client, database) = establish_connection(&config).await?;

        let store = Self {
            inner: Arc::new(MongoInner {
                database,
                ttl,
                clock,
            }),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        // MongoDB purges expired documents lazily; reads also filter on `expires_at`.
        let expiry = IndexModel::builder()
            .keys(doc! {"expires_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("lobby_expiry_idx".to_owned()))
                    .expire_after(Some(Duration::ZERO))
                    .build(),
            )
            .build();
        self.lobbies()
            .create_index(expiry)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: LOBBY_COLLECTION_NAME,
                index: "expires_at",
                source,
            })?;

        let message_expiry = IndexModel::builder()
            .keys(doc! {"expires_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("message_expiry_idx".to_owned()))
                    .expire_after(Some(Duration::ZERO))
                    .build(),
            )
            .build();
        let by_lobby = IndexModel::builder()
            .keys(doc! {"lobby_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("message_lobby_idx".to_owned()))
                    .build(),
            )
            .build();
        self.messages()
            .create_indexes([message_expiry, by_lobby])
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: MESSAGE_INDEX_COLLECTION_NAME,
                index: "expires_at,lobby_id",
                source,
            })?;

        Ok(())
    }

    fn lobbies(&self) -> Collection<MongoLobbyDocument> {
        self.inner
            .database
            .collection::<MongoLobbyDocument>(LOBBY_COLLECTION_NAME)
    }

    fn guild_index(&self) -> Collection<MongoGuildIndexDocument> {
        self.inner
            .database
            .collection::<MongoGuildIndexDocument>(GUILD_INDEX_COLLECTION_NAME)
    }

    fn messages(&self) -> Collection<MongoMessageIndexDocument> {
        self.inner
            .database
            .collection::<MongoMessageIndexDocument>(MESSAGE_INDEX_COLLECTION_NAME)
    }

    /// Index entries are written before the lobby document. A failure part way
    /// leaves at most dangling index entries, which reads already skip.
    async fn put(&self, lobby: LobbyRecord) -> MongoResult<()> {
        let id = lobby.id;
        let expires_at = self.inner.clock.now() + self.inner.ttl;

        self.guild_index()
            .update_one(
                doc! {"_id": lobby.guild_id.as_str()},
                doc! {"$addToSet": {"lobby_ids": id.to_string()}},
            )
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveLobby { id, source })?;

        if let Some(message_id) = lobby.bound_message() {
            let entry = MongoMessageIndexDocument {
                message_id: message_id.to_owned(),
                lobby_id: id.to_string(),
                expires_at: bson_time(expires_at),
            };
            self.messages()
                .replace_one(doc! {"_id": message_id}, &entry)
                .upsert(true)
                .await
                .map_err(|source| MongoDaoError::SaveLobby { id, source })?;
        }

        let document = MongoLobbyDocument::new(lobby, expires_at);
        self.lobbies()
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveLobby { id, source })?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> MongoResult<Option<LobbyRecord>> {
        let now = self.inner.clock.now();
        let document = self
            .lobbies()
            .find_one(live_filter(doc_id(id), now))
            .await
            .map_err(|source| MongoDaoError::LoadLobby { id, source })?;

        Ok(document.map(|document| document.lobby))
    }

    async fn list_by_guild(&self, guild_id: String) -> MongoResult<Vec<LobbyRecord>> {
        let list_error = |source: mongodb::error::Error| MongoDaoError::ListGuild {
            guild_id: guild_id.clone(),
            source,
        };

        let Some(index) = self
            .guild_index()
            .find_one(doc! {"_id": guild_id.as_str()})
            .await
            .map_err(list_error)?
        else {
            return Ok(Vec::new());
        };

        if index.lobby_ids.is_empty() {
            return Ok(Vec::new());
        }

        let now = self.inner.clock.now();
        let documents: Vec<MongoLobbyDocument> = self
            .lobbies()
            .find(live_filter(doc! {"_id": {"$in": index.lobby_ids.clone()}}, now))
            .await
            .map_err(list_error)?
            .try_collect()
            .await
            .map_err(list_error)?;

        let mut records: Vec<LobbyRecord> =
            documents.into_iter().map(|document| document.lobby).collect();
        sort_newest_first(&mut records);
        Ok(records)
    }

    async fn find_by_message(&self, message_id: String) -> MongoResult<Option<LobbyRecord>> {
        let entry = self
            .messages()
            .find_one(live_filter(doc! {"_id": message_id.as_str()}, self.inner.clock.now()))
            .await
            .map_err(|source| MongoDaoError::LoadMessage {
                message_id: message_id.clone(),
                source,
            })?;

        let Some(entry) = entry else {
            return Ok(None);
        };
        let Ok(lobby_id) = Uuid::parse_str(&entry.lobby_id) else {
            return Ok(None);
        };

        self.get(lobby_id).await
    }

    /// The lobby document goes first; once it is gone the delete has happened,
    /// so index cleanup failures are only logged.
    async fn delete(&self, id: Uuid) -> MongoResult<bool> {
        let now = self.inner.clock.now();
        let removed = self
            .lobbies()
            .find_one_and_delete(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::DeleteLobby { id, source })?;

        let Some(removed) = removed else {
            return Ok(false);
        };

        if let Err(err) = self
            .guild_index()
            .update_one(
                doc! {"_id": removed.guild_id.as_str()},
                doc! {"$pull": {"lobby_ids": id.to_string()}},
            )
            .await
        {
            warn!(lobby_id = %id, error = %err, "failed to unlink deleted lobby from its guild");
        }

        if let Err(err) = self
            .messages()
            .delete_many(doc! {"lobby_id": id.to_string()})
            .await
        {
            warn!(lobby_id = %id, error = %err, "failed to drop message index of deleted lobby");
        }

        Ok(removed.expires_at > bson_time(now))
    }

    async fn ping(&self) -> MongoResult<()> {
        self.inner
            .database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }
}

impl LobbyStore for MongoLobbyStore {
    fn put(&self, lobby: LobbyRecord) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.put(lobby).await.map_err(Into::into) })
    }

    fn get(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<LobbyRecord>>> {
        let store = self.clone();
        Box::pin(async move { store.get(id).await.map_err(Into::into) })
    }

    fn list_by_guild(&self, guild_id: String) -> BoxFuture<'static, StorageResult<Vec<LobbyRecord>>> {
        let store = self.clone();
        Box::pin(async move { store.list_by_guild(guild_id).await.map_err(Into::into) })
    }

    fn find_by_message(
        &self,
        message_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<LobbyRecord>>> {
        let store = self.clone();
        Box::pin(async move { store.find_by_message(message_id).await.map_err(Into::into) })
    }

    fn delete(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete(id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }
}
