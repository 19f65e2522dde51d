use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    dto::lobby::LobbyResponse,
    state::hub::{ChangeKind, LobbyChange},
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }

    /// Serialise a committed lobby change under its event name.
    pub fn from_change(change: &LobbyChange) -> serde_json::Result<Self> {
        let event = Some(change.kind.event_name().to_owned());
        match (&change.kind, &change.lobby) {
            (ChangeKind::Created | ChangeKind::Updated, Some(lobby)) => {
                Self::json(event, &LobbyResponse::from(lobby))
            }
            _ => Self::json(
                event,
                &LobbyDeletedEvent {
                    id: change.lobby_id,
                    guild_id: change.guild_id.clone(),
                },
            ),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Guild the stream is restricted to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast when a lobby has been deleted.
pub struct LobbyDeletedEvent {
    pub id: Uuid,
    pub guild_id: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
/// Filters accepted by the lobby stream.
pub struct LobbyStreamQuery {
    /// Only forward changes of this guild.
    pub guild_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::state::lobby::{Lobby, NewLobby};

    #[test]
    fn deletions_carry_only_ids() {
        let id = Uuid::nil();
        let event = ServerEvent::from_change(&LobbyChange {
            kind: ChangeKind::Deleted,
            lobby_id: id,
            guild_id: "g".into(),
            lobby: None,
        })
        .unwrap();
        assert_eq!(event.event.as_deref(), Some("lobby.deleted"));
        assert_eq!(
            event.data,
            format!(r#"{{"id":"{id}","guildId":"g"}}"#)
        );
    }

    #[test]
    fn updates_carry_the_snapshot() {
        let lobby = Lobby::open(
            NewLobby {
                guild_id: "g".into(),
                channel_id: "c".into(),
                creator_id: "u".into(),
                title: "Scrim".into(),
                scheduled_start_time: None,
                max_participants: None,
            },
            datetime!(2026-03-03 10:00 UTC),
        );
        let event = ServerEvent::from_change(&LobbyChange {
            kind: ChangeKind::Updated,
            lobby_id: lobby.id(),
            guild_id: "g".into(),
            lobby: Some(lobby.clone()),
        })
        .unwrap();
        assert_eq!(event.event.as_deref(), Some("lobby.updated"));
        let value: serde_json::Value = serde_json::from_str(&event.data).unwrap();
        assert_eq!(value["id"], serde_json::json!(lobby.id()));
    }
}
