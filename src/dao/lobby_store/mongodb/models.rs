use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::models::LobbyRecord;

/// One document per lobby; `expires_at` drives the TTL index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoLobbyDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub guild_id: String,
    pub lobby: LobbyRecord,
    pub expires_at: DateTime,
}

impl MongoLobbyDocument {
    pub fn new(lobby: LobbyRecord, expires_at: OffsetDateTime) -> Self {
        Self {
            id: lobby.id.to_string(),
            guild_id: lobby.guild_id.clone(),
            lobby,
            expires_at: bson_time(expires_at),
        }
    }
}

/// Set of lobby ids per guild. Never expires; dangling ids are skipped on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGuildIndexDocument {
    #[serde(rename = "_id")]
    pub guild_id: String,
    #[serde(default)]
    pub lobby_ids: Vec<String>,
}

/// Message id to lobby id mapping, expiring together with its lobby.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMessageIndexDocument {
    #[serde(rename = "_id")]
    pub message_id: String,
    pub lobby_id: String,
    pub expires_at: DateTime,
}

pub fn bson_time(at: OffsetDateTime) -> DateTime {
    DateTime::from_millis((at.unix_timestamp_nanos() / 1_000_000) as i64)
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": id.to_string()}
}

/// Filter matching a live (not yet expired) lobby document.
pub fn live_filter(filter: Document, now: OffsetDateTime) -> Document {
    let mut filter = filter;
    filter.insert("expires_at", doc! {"$gt": bson_time(now)});
    filter
}
