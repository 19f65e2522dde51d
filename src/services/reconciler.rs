//! Keeps the chat message of each lobby in sync with its stored state.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    gateway::{
        ButtonStyle, ButtonView, ChatGateway, EmbedField, EmbedView, GatewayError, MessageView,
    },
    state::{lobby::Lobby, state_machine::LobbyStatus},
};

const PENDING_COLOR: u32 = 0x00ff00;
const CLOSED_COLOR: u32 = 0xff0000;

/// Emoji shared by the buttons and the reaction shortcuts.
pub const JOIN_EMOJI: &str = "✅";
pub const LEAVE_EMOJI: &str = "❌";
pub const START_EMOJI: &str = "▶️";
pub const CANCEL_EMOJI: &str = "⏹️";

/// Build the message view of a lobby snapshot.
pub fn render_view(lobby: &Lobby) -> MessageView {
    let status = lobby.status();

    let participants = match lobby.max_participants() {
        Some(max) => format!("{}/{}", lobby.participant_count(), max),
        None => lobby.participant_count().to_string(),
    };

    let mut fields = vec![
        EmbedField {
            name: "Status".into(),
            value: format!("{} {}", status_glyph(status), status.as_str().to_uppercase()),
            inline: true,
        },
        EmbedField {
            name: "Participants".into(),
            value: participants,
            inline: true,
        },
    ];

    if let Some(scheduled) = lobby.scheduled_start_time() {
        fields.push(EmbedField {
            name: "Scheduled Start".into(),
            value: format!("<t:{}:F>", scheduled.unix_timestamp()),
            inline: true,
        });
    }

    if lobby.participant_count() > 0 {
        let players = lobby
            .participants()
            .map(|user| format!("<@{user}>"))
            .collect::<Vec<_>>()
            .join(", ");
        fields.push(EmbedField {
            name: "Players".into(),
            value: players,
            inline: false,
        });
    }

    let embed = EmbedView {
        title: format!("🎮 {}", lobby.title()),
        description: format!("Created by <@{}>", lobby.creator_id()),
        color: if status == LobbyStatus::Pending {
            PENDING_COLOR
        } else {
            CLOSED_COLOR
        },
        fields,
        timestamp: lobby.created_at(),
    };

    let id = lobby.id();
    let pending = status == LobbyStatus::Pending;
    let button = |action: &str, label: &str, emoji: &str, style: ButtonStyle, enabled: bool| ButtonView {
        custom_id: format!("{action}_{id}"),
        label: label.into(),
        emoji: emoji.into(),
        style,
        disabled: !enabled,
    };

    MessageView {
        embed,
        buttons: vec![
            button("join", "Join", JOIN_EMOJI, ButtonStyle::Success, pending),
            button("leave", "Leave", LEAVE_EMOJI, ButtonStyle::Secondary, pending),
            button("start", "Start", START_EMOJI, ButtonStyle::Primary, pending),
            button(
                "cancel",
                "Cancel",
                CANCEL_EMOJI,
                ButtonStyle::Danger,
                !status.is_terminal(),
            ),
        ],
    }
}

fn status_glyph(status: LobbyStatus) -> &'static str {
    match status {
        LobbyStatus::Pending => "⏳",
        LobbyStatus::Active => START_EMOJI,
        LobbyStatus::Cancelled => LEAVE_EMOJI,
        LobbyStatus::Completed => JOIN_EMOJI,
    }
}

/// Pushes rendered lobbies to the chat gateway, when one is configured.
#[derive(Clone, Default)]
pub struct Reconciler {
    gateway: Option<Arc<dyn ChatGateway>>,
}

impl Reconciler {
    pub fn new(gateway: Option<Arc<dyn ChatGateway>>) -> Self {
        Self { gateway }
    }

    /// Post the first message of a lobby and return its id.
    ///
    /// Returns `Ok(None)` when no gateway is configured.
    pub async fn publish(&self, lobby: &Lobby) -> Result<Option<String>, GatewayError> {
        let Some(gateway) = &self.gateway else {
            return Ok(None);
        };

        ensure_text_channel(gateway.as_ref(), lobby.channel_id()).await?;
        let message_id = gateway
            .post_message(lobby.channel_id().to_owned(), render_view(lobby))
            .await?;
        debug!(lobby_id = %lobby.id(), message_id = %message_id, "lobby message posted");
        Ok(Some(message_id))
    }

    /// Re-render the bound message of a lobby. Failures are logged, never returned.
    pub async fn refresh(&self, lobby: &Lobby) {
        let Some(gateway) = &self.gateway else {
            return;
        };
        let Some(message_id) = lobby.message_id() else {
            debug!(lobby_id = %lobby.id(), "lobby not rendered yet; skipping refresh");
            return;
        };

        if let Err(err) = edit(gateway.as_ref(), lobby, message_id).await {
            warn!(
                lobby_id = %lobby.id(),
                message_id,
                error = %err,
                "failed to refresh lobby message"
            );
        }
    }
}

async fn edit(gateway: &dyn ChatGateway, lobby: &Lobby, message_id: &str) -> Result<String, GatewayError> {
    ensure_text_channel(gateway, lobby.channel_id()).await?;
    gateway
        .edit_message(
            lobby.channel_id().to_owned(),
            message_id.to_owned(),
            render_view(lobby),
        )
        .await
}

async fn ensure_text_channel(gateway: &dyn ChatGateway, channel_id: &str) -> Result<(), GatewayError> {
    match gateway.fetch_channel(channel_id.to_owned()).await? {
        Some(channel) if channel.text_based => Ok(()),
        _ => Err(GatewayError::ChannelUnavailable {
            channel_id: channel_id.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use time::macros::datetime;

    use super::*;
    use crate::{
        gateway::testing::{GatewayCall, RecordingGateway},
        state::lobby::NewLobby,
    };

    fn lobby(max: Option<u32>) -> Lobby {
        Lobby::open(
            NewLobby {
                guild_id: "g".into(),
                channel_id: "c".into(),
                creator_id: "100".into(),
                title: "Aim duel".into(),
                scheduled_start_time: Some(datetime!(2026-07-01 20:00 UTC)),
                max_participants: max.and_then(NonZeroU32::new),
            },
            datetime!(2026-07-01 18:00 UTC),
        )
    }

    fn field<'a>(view: &'a MessageView, name: &str) -> Option<&'a str> {
        view.embed
            .fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.value.as_str())
    }

    #[test]
    fn pending_view_lists_players_and_capacity() {
        let mut lobby = lobby(Some(4));
        lobby
            .add_participant("200", datetime!(2026-07-01 18:05 UTC))
            .unwrap();
        let view = render_view(&lobby);

        assert_eq!(view.embed.title, "🎮 Aim duel");
        assert_eq!(view.embed.color, PENDING_COLOR);
        assert_eq!(view.embed.description, "Created by <@100>");
        assert_eq!(field(&view, "Status"), Some("⏳ PENDING"));
        assert_eq!(field(&view, "Participants"), Some("2/4"));
        assert_eq!(field(&view, "Scheduled Start"), Some("<t:1782936000:F>"));
        assert_eq!(field(&view, "Players"), Some("<@100>, <@200>"));
        assert_eq!(view.embed.timestamp, lobby.created_at());

        let ids: Vec<_> = view.buttons.iter().map(|b| b.custom_id.clone()).collect();
        assert_eq!(
            ids,
            ["join", "leave", "start", "cancel"]
                .map(|action| format!("{action}_{}", lobby.id()))
        );
        assert!(view.buttons.iter().all(|b| !b.disabled));
    }

    #[test]
    fn uncapped_lobby_shows_plain_count() {
        let view = render_view(&lobby(None));
        assert_eq!(field(&view, "Participants"), Some("1"));
    }

    #[test]
    fn closed_lobby_turns_red_and_disables_buttons() {
        let mut lobby = lobby(None);
        lobby.cancel(datetime!(2026-07-01 19:00 UTC)).unwrap();
        let view = render_view(&lobby);

        assert_eq!(view.embed.color, CLOSED_COLOR);
        assert_eq!(field(&view, "Status"), Some("❌ CANCELLED"));
        assert!(view.buttons.iter().all(|b| b.disabled));
    }

    #[test]
    fn active_lobby_can_still_be_cancelled() {
        let mut lobby = lobby(None);
        lobby.start(datetime!(2026-07-01 20:00 UTC)).unwrap();
        let view = render_view(&lobby);

        let enabled: Vec<_> = view
            .buttons
            .iter()
            .filter(|b| !b.disabled)
            .map(|b| b.label.as_str())
            .collect();
        assert_eq!(enabled, vec!["Cancel"]);
    }

    #[tokio::test]
    async fn refresh_skips_unbound_lobbies() {
        let gateway = Arc::new(RecordingGateway::new());
        let reconciler = Reconciler::new(Some(gateway.clone() as Arc<dyn ChatGateway>));

        reconciler.refresh(&lobby(None)).await;
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn publish_then_refresh_edits_the_bound_message() {
        let gateway = Arc::new(RecordingGateway::new());
        let reconciler = Reconciler::new(Some(gateway.clone() as Arc<dyn ChatGateway>));
        let mut lobby = lobby(None);

        let message_id = reconciler.publish(&lobby).await.unwrap().unwrap();
        lobby
            .bind_message(&message_id, datetime!(2026-07-01 18:01 UTC))
            .unwrap();
        reconciler.refresh(&lobby).await;

        let calls = gateway.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(
            &calls[1],
            GatewayCall::Edit { message_id: edited, .. } if *edited == message_id
        ));
    }

    #[tokio::test]
    async fn refresh_failures_are_swallowed() {
        let gateway = Arc::new(RecordingGateway::new());
        let reconciler = Reconciler::new(Some(gateway.clone() as Arc<dyn ChatGateway>));
        let mut lobby = lobby(None);
        lobby
            .bind_message("gone", datetime!(2026-07-01 18:01 UTC))
            .unwrap();

        gateway.set_failing(true);
        reconciler.refresh(&lobby).await;
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn disabled_reconciler_publishes_nothing() {
        let reconciler = Reconciler::default();
        assert_eq!(reconciler.publish(&lobby(None)).await.unwrap(), None);
    }
}
