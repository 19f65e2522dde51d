use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{dto::lobby::LobbyResponse, services::interaction_router::InteractionOutcome};

/// Event forwarded by a chat gateway bridge.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// A slash command was invoked.
    Command {
        guild_id: String,
        channel_id: String,
        user_id: String,
        name: String,
        #[serde(default)]
        options: CommandOptions,
    },
    /// A message button was pressed.
    Component {
        message_id: String,
        custom_id: String,
        user_id: String,
    },
    ReactionAdd {
        message_id: String,
        emoji: String,
        user_id: String,
    },
    ReactionRemove {
        message_id: String,
        emoji: String,
        user_id: String,
    },
}

/// Options of the lobby creation command.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CommandOptions {
    pub title: Option<String>,
    /// `YYYY-MM-DD HH:MM` (UTC) or RFC 3339.
    pub time: Option<String>,
    pub max_players: Option<i64>,
}

/// What the router did with an inbound event.
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InteractionResponse {
    Created { lobby: LobbyResponse },
    Updated { lobby: LobbyResponse },
    Ignored,
    /// Should be shown to the acting user only.
    Rejected { reason: String },
}

impl From<InteractionOutcome> for InteractionResponse {
    fn from(outcome: InteractionOutcome) -> Self {
        match outcome {
            InteractionOutcome::Created(lobby) => InteractionResponse::Created {
                lobby: lobby.into(),
            },
            InteractionOutcome::Updated(lobby) => InteractionResponse::Updated {
                lobby: lobby.into(),
            },
            InteractionOutcome::Ignored => InteractionResponse::Ignored,
            InteractionOutcome::Rejected(reason) => InteractionResponse::Rejected { reason },
        }
    }
}
