use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::validation::{parse_start_time, validate_start_time, validate_title},
    error::LobbyError,
    state::{
        lobby::{Lobby, LobbyPatch, NewLobby},
        state_machine::LobbyStatus,
    },
};

/// Payload used to open a new lobby.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLobbyRequest {
    #[validate(length(min = 1))]
    pub guild_id: String,
    #[validate(length(min = 1))]
    pub channel_id: String,
    /// User opening the lobby; joined automatically.
    #[validate(length(min = 1))]
    pub creator_id: String,
    #[validate(custom(function = "validate_title"))]
    pub title: String,
    /// RFC 3339, or `YYYY-MM-DD HH:MM` interpreted as UTC.
    #[validate(custom(function = "validate_start_time"))]
    pub scheduled_start_time: Option<String>,
    #[validate(range(min = 1))]
    pub max_participants: Option<u32>,
}

impl TryFrom<CreateLobbyRequest> for NewLobby {
    type Error = LobbyError;

    fn try_from(request: CreateLobbyRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            guild_id: request.guild_id,
            channel_id: request.channel_id,
            creator_id: request.creator_id,
            title: request.title,
            scheduled_start_time: request
                .scheduled_start_time
                .as_deref()
                .map(parse_time)
                .transpose()?,
            max_participants: request.max_participants.and_then(NonZeroU32::new),
        })
    }
}

/// Partial edit of a pending lobby.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLobbyRequest {
    pub title: Option<String>,
    /// If not specified, keeps the schedule. If null, clears it.
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub scheduled_start_time: Option<Option<String>>,
    /// If not specified, keeps the capacity. If null, removes the bound.
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<u32>)]
    pub max_participants: Option<Option<u32>>,
}

impl Validate for UpdateLobbyRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(ref title) = self.title {
            if let Err(e) = validate_title(title) {
                errors.add("title", e);
            }
        }

        if let Some(Some(ref start)) = self.scheduled_start_time {
            if let Err(e) = validate_start_time(start) {
                errors.add("scheduledStartTime", e);
            }
        }

        if let Some(Some(0)) = self.max_participants {
            let mut err = validator::ValidationError::new("range");
            err.message = Some("Capacity must be at least 1".into());
            errors.add("maxParticipants", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl TryFrom<UpdateLobbyRequest> for LobbyPatch {
    type Error = LobbyError;

    fn try_from(request: UpdateLobbyRequest) -> Result<Self, Self::Error> {
        let scheduled_start_time = match request.scheduled_start_time {
            Some(Some(value)) => Some(Some(parse_time(&value)?)),
            Some(None) => Some(None),
            None => None,
        };

        Ok(Self {
            title: request.title,
            scheduled_start_time,
            max_participants: request
                .max_participants
                .map(|max| max.and_then(NonZeroU32::new)),
        })
    }
}

fn parse_time(value: &str) -> Result<OffsetDateTime, LobbyError> {
    parse_start_time(value)
        .ok_or_else(|| LobbyError::InvalidInput(format!("invalid start time `{value}`")))
}

/// Identifies the user joining or leaving.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRequest {
    #[validate(length(min = 1))]
    pub user_id: String,
}

/// Full lobby snapshot returned by every lobby route.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LobbyResponse {
    pub id: Uuid,
    pub guild_id: String,
    pub channel_id: String,
    /// Rendered chat message, once posted.
    pub message_id: Option<String>,
    pub creator_id: String,
    pub title: String,
    #[serde(with = "time::serde::rfc3339::option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub scheduled_start_time: Option<OffsetDateTime>,
    pub status: LobbyStatus,
    /// Join order; the creator is first.
    pub participants: Vec<String>,
    pub max_participants: Option<u32>,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: OffsetDateTime,
}

impl From<&Lobby> for LobbyResponse {
    fn from(lobby: &Lobby) -> Self {
        Self {
            id: lobby.id(),
            guild_id: lobby.guild_id().to_owned(),
            channel_id: lobby.channel_id().to_owned(),
            message_id: lobby.message_id().map(str::to_owned),
            creator_id: lobby.creator_id().to_owned(),
            title: lobby.title().to_owned(),
            scheduled_start_time: lobby.scheduled_start_time(),
            status: lobby.status(),
            participants: lobby.participants().map(str::to_owned).collect(),
            max_participants: lobby.max_participants().map(NonZeroU32::get),
            created_at: lobby.created_at(),
            updated_at: lobby.updated_at(),
        }
    }
}

impl From<Lobby> for LobbyResponse {
    fn from(lobby: Lobby) -> Self {
        Self::from(&lobby)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;

    use super::*;

    #[test]
    fn update_distinguishes_missing_from_null() {
        let request: UpdateLobbyRequest =
            serde_json::from_value(json!({"scheduledStartTime": null})).unwrap();
        let patch = LobbyPatch::try_from(request).unwrap();
        assert_eq!(patch.scheduled_start_time, Some(None));
        assert_eq!(patch.max_participants, None);
        assert_eq!(patch.title, None);

        let request: UpdateLobbyRequest =
            serde_json::from_value(json!({"maxParticipants": 8, "title": "Finals"})).unwrap();
        let patch = LobbyPatch::try_from(request).unwrap();
        assert_eq!(patch.max_participants, Some(NonZeroU32::new(8)));
        assert_eq!(patch.title.as_deref(), Some("Finals"));
    }

    #[test]
    fn update_validation_rejects_bad_fields() {
        let request: UpdateLobbyRequest = serde_json::from_value(json!({
            "title": " ",
            "scheduledStartTime": "soon",
            "maxParticipants": 0
        }))
        .unwrap();
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("scheduledStartTime"));
        assert!(fields.contains_key("maxParticipants"));
    }

    #[test]
    fn create_request_parses_short_time_as_utc() {
        let request: CreateLobbyRequest = serde_json::from_value(json!({
            "guildId": "g",
            "channelId": "c",
            "creatorId": "u",
            "title": "Scrim",
            "scheduledStartTime": "2026-08-01 21:00",
            "maxParticipants": 10
        }))
        .unwrap();
        assert!(request.validate().is_ok());

        let new = NewLobby::try_from(request).unwrap();
        assert_eq!(new.scheduled_start_time, Some(datetime!(2026-08-01 21:00 UTC)));
        assert_eq!(new.max_participants, NonZeroU32::new(10));
    }

    #[test]
    fn response_omits_unset_optionals() {
        let lobby = Lobby::open(
            NewLobby {
                guild_id: "g".into(),
                channel_id: "c".into(),
                creator_id: "u".into(),
                title: "Scrim".into(),
                scheduled_start_time: None,
                max_participants: None,
            },
            datetime!(2026-08-01 18:00 UTC),
        );
        let value = serde_json::to_value(LobbyResponse::from(&lobby)).unwrap();
        assert_eq!(value["status"], json!("pending"));
        assert_eq!(value["participants"], json!(["u"]));
        assert_eq!(value["createdAt"], json!("2026-08-01T18:00:00Z"));
        assert!(value.get("messageId").is_none());
        assert!(value.get("scheduledStartTime").is_none());
        assert!(value.get("maxParticipants").is_none());
    }
}
