pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::LobbyRecord;
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Default lifetime of a lobby record, refreshed on every write.
pub const DEFAULT_LOBBY_TTL: std::time::Duration = std::time::Duration::from_secs(60 * 60 * 24 * 7);

/// Abstraction over the expiring persistence layer for lobbies.
///
/// Every lobby record lives under its own id with a time-to-live refreshed by
/// [`LobbyStore::put`]. Two secondary indexes are maintained alongside: the set
/// of lobby ids per guild (no expiry, dangling ids resolve to nothing) and the
/// mapping from a bound message id to its lobby.
pub trait LobbyStore: Send + Sync {
    /// Store the record and refresh its expiry; register it in the guild and message indexes.
    fn put(&self, lobby: LobbyRecord) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a live record. Expired and absent records both yield `None`.
    fn get(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<LobbyRecord>>>;
    /// Every live record of a guild, newest first.
    fn list_by_guild(&self, guild_id: String) -> BoxFuture<'static, StorageResult<Vec<LobbyRecord>>>;
    /// Resolve the lobby rendered as `message_id`.
    fn find_by_message(
        &self,
        message_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<LobbyRecord>>>;
    /// Remove the record and its index entries. Returns whether a live record existed.
    fn delete(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Order records newest first, breaking ties by id so listings are stable.
pub(crate) fn sort_newest_first(records: &mut [LobbyRecord]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
}
