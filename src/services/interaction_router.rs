//! Maps chat interactions onto lobby operations, with creator-only controls.

use std::num::NonZeroU32;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        gateway::{CommandOptions, InboundEvent},
        validation::{parse_start_time, validate_title},
    },
    error::LobbyError,
    services::{
        lobby_service::LobbyService,
        reconciler::{CANCEL_EMOJI, JOIN_EMOJI, LEAVE_EMOJI, START_EMOJI},
    },
    state::lobby::{Lobby, NewLobby},
};

/// Name of the slash command that opens a lobby.
pub const LOBBY_COMMAND: &str = "scrim";

const VARIATION_SELECTOR: char = '\u{fe0f}';

/// Result of routing one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionOutcome {
    Created(Lobby),
    Updated(Lobby),
    /// Nothing to do: unknown target, stale message, or a control reserved to the creator.
    Ignored,
    /// The request was refused; the reason is meant for the acting user only.
    Rejected(String),
}

/// Lobby actions reachable from buttons and reactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyAction {
    Join,
    Leave,
    Start,
    Cancel,
}

impl LobbyAction {
    /// Parse the prefix of a button custom id.
    pub fn from_custom_id(custom_id: &str) -> Option<(Self, Uuid)> {
        let (action, id) = custom_id.split_once('_')?;
        let action = match action {
            "join" => LobbyAction::Join,
            "leave" => LobbyAction::Leave,
            "start" => LobbyAction::Start,
            "cancel" => LobbyAction::Cancel,
            _ => return None,
        };
        Some((action, Uuid::parse_str(id).ok()?))
    }

    /// Action bound to a reaction emoji. Variation selectors are ignored.
    pub fn from_emoji(emoji: &str) -> Option<Self> {
        let bare = |glyph: &str| glyph.trim_end_matches(VARIATION_SELECTOR).to_owned();
        let emoji = bare(emoji);
        [
            (JOIN_EMOJI, LobbyAction::Join),
            (LEAVE_EMOJI, LobbyAction::Leave),
            (START_EMOJI, LobbyAction::Start),
            (CANCEL_EMOJI, LobbyAction::Cancel),
        ]
        .into_iter()
        .find(|(glyph, _)| bare(glyph) == emoji)
        .map(|(_, action)| action)
    }

    fn creator_only(self) -> bool {
        matches!(self, LobbyAction::Start | LobbyAction::Cancel)
    }
}

/// Bounds accepted for the `max_players` command option.
#[derive(Debug, Clone, Copy)]
pub struct PlayerBounds {
    pub min: u32,
    pub max: u32,
}

impl Default for PlayerBounds {
    fn default() -> Self {
        Self { min: 2, max: 50 }
    }
}

/// Routes inbound chat events to the lobby service.
#[derive(Clone)]
pub struct InteractionRouter {
    service: LobbyService,
    bounds: PlayerBounds,
}

impl InteractionRouter {
    pub fn new(service: LobbyService, bounds: PlayerBounds) -> Self {
        Self { service, bounds }
    }

    /// Handle one event. Only store failures are returned as errors.
    pub async fn handle(&self, event: InboundEvent) -> Result<InteractionOutcome, LobbyError> {
        match event {
            InboundEvent::Command {
                guild_id,
                channel_id,
                user_id,
                name,
                options,
            } => {
                if name != LOBBY_COMMAND {
                    debug!(command = %name, "ignoring unknown command");
                    return Ok(InteractionOutcome::Ignored);
                }
                self.create(guild_id, channel_id, user_id, options).await
            }
            InboundEvent::Component {
                custom_id, user_id, ..
            } => {
                let Some((action, lobby_id)) = LobbyAction::from_custom_id(&custom_id) else {
                    debug!(custom_id = %custom_id, "ignoring unknown component");
                    return Ok(InteractionOutcome::Ignored);
                };
                let Some(lobby) = self.service.engine().get(lobby_id).await? else {
                    return Ok(InteractionOutcome::Ignored);
                };
                self.apply(&lobby, action, &user_id).await
            }
            InboundEvent::ReactionAdd {
                message_id,
                emoji,
                user_id,
            } => {
                let Some(action) = LobbyAction::from_emoji(&emoji) else {
                    return Ok(InteractionOutcome::Ignored);
                };
                self.react(&message_id, action, &user_id).await
            }
            InboundEvent::ReactionRemove {
                message_id,
                emoji,
                user_id,
            } => {
                // Only withdrawing the join reaction means something.
                if LobbyAction::from_emoji(&emoji) != Some(LobbyAction::Join) {
                    return Ok(InteractionOutcome::Ignored);
                }
                self.react(&message_id, LobbyAction::Leave, &user_id).await
            }
        }
    }

    async fn create(
        &self,
        guild_id: String,
        channel_id: String,
        creator_id: String,
        options: CommandOptions,
    ) -> Result<InteractionOutcome, LobbyError> {
        let Some(title) = options.title.filter(|title| !title.trim().is_empty()) else {
            return Ok(InteractionOutcome::Rejected("❌ A title is required.".into()));
        };
        if let Err(err) = validate_title(&title) {
            let reason = err.message.unwrap_or_else(|| err.code.clone());
            return Ok(InteractionOutcome::Rejected(format!("❌ {reason}.")));
        }

        let scheduled_start_time = match options.time.as_deref() {
            Some(raw) => match parse_start_time(raw) {
                Some(time) => Some(time),
                None => {
                    return Ok(InteractionOutcome::Rejected(
                        "❌ Invalid time format. Please use YYYY-MM-DD HH:MM format.".into(),
                    ));
                }
            },
            None => None,
        };

        let max_participants = match options.max_players {
            None => None,
            Some(max) if (self.bounds.min as i64..=self.bounds.max as i64).contains(&max) => {
                NonZeroU32::new(max as u32)
            }
            Some(_) => {
                return Ok(InteractionOutcome::Rejected(format!(
                    "❌ max_players must be between {} and {}.",
                    self.bounds.min, self.bounds.max
                )));
            }
        };

        let lobby = self
            .service
            .engine()
            .create(NewLobby {
                guild_id,
                channel_id,
                creator_id,
                title,
                scheduled_start_time,
                max_participants,
            })
            .await?;

        match self.service.render_new(&lobby).await {
            Ok(bound) => {
                info!(
                    lobby_id = %bound.id(),
                    creator_id = bound.creator_id(),
                    "lobby opened from command"
                );
                Ok(InteractionOutcome::Created(bound))
            }
            Err(err) => {
                warn!(lobby_id = %lobby.id(), error = %err, "could not post lobby message");
                Ok(InteractionOutcome::Rejected(format!(
                    "❌ Failed to create scrim: {err}"
                )))
            }
        }
    }

    async fn react(
        &self,
        message_id: &str,
        action: LobbyAction,
        user_id: &str,
    ) -> Result<InteractionOutcome, LobbyError> {
        let Some(lobby) = self.service.find_by_message(message_id).await? else {
            debug!(message_id, "reaction on a message without lobby");
            return Ok(InteractionOutcome::Ignored);
        };
        self.apply(&lobby, action, user_id).await
    }

    async fn apply(
        &self,
        lobby: &Lobby,
        action: LobbyAction,
        user_id: &str,
    ) -> Result<InteractionOutcome, LobbyError> {
        if action.creator_only() && lobby.creator_id() != user_id {
            debug!(lobby_id = %lobby.id(), user_id, ?action, "control reserved to the creator");
            return Ok(InteractionOutcome::Ignored);
        }

        let id = lobby.id();
        let result = match action {
            LobbyAction::Join => self.service.add_participant(id, user_id).await,
            LobbyAction::Leave => self.service.remove_participant(id, user_id).await,
            LobbyAction::Start => self.service.start(id).await,
            LobbyAction::Cancel => self.service.cancel(id).await,
        };

        match result {
            Ok(lobby) => Ok(InteractionOutcome::Updated(lobby)),
            Err(LobbyError::NotFound(_)) => Ok(InteractionOutcome::Ignored),
            Err(err) if err.is_validation() => Ok(InteractionOutcome::Rejected(err.to_string())),
            Err(err) => Err(err),
        }
    }
}
