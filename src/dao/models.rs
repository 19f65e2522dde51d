use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::state::state_machine::LobbyStatus;

/// Persisted shape of a lobby, one record per lobby id.
///
/// `message_id` is the empty string until the lobby has been rendered once.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LobbyRecord {
    /// Stable identifier for the lobby.
    pub id: Uuid,
    /// Guild owning the lobby.
    pub guild_id: String,
    /// Channel the lobby message lives in.
    pub channel_id: String,
    /// Rendered message id, empty while unbound.
    #[serde(default)]
    pub message_id: String,
    /// User who created the lobby.
    pub creator_id: String,
    /// Free-text label.
    pub title: String,
    /// Earliest instant the lobby may start.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub scheduled_start_time: Option<OffsetDateTime>,
    /// Lifecycle status.
    pub status: LobbyStatus,
    /// Participants in join order.
    pub participants: Vec<String>,
    /// Optional capacity bound.
    pub max_participants: Option<u32>,
    /// Creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last mutation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl LobbyRecord {
    /// Bound message id, if any.
    pub fn bound_message(&self) -> Option<&str> {
        Some(self.message_id.as_str()).filter(|id| !id.is_empty())
    }
}
