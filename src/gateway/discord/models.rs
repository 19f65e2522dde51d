//! Wire payloads of the Discord REST API, limited to what lobbies render.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::gateway::{ButtonView, EmbedField, MessageView};

const ACTION_ROW: u8 = 1;
const BUTTON: u8 = 2;
/// Channel types that accept messages: guild text, DM, announcement and the three thread kinds.
const TEXT_CHANNEL_TYPES: [u8; 6] = [0, 1, 5, 10, 11, 12];

#[derive(Debug, Deserialize)]
pub(super) struct ChannelPayload {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
}

impl ChannelPayload {
    pub fn is_text_based(&self) -> bool {
        TEXT_CHANNEL_TYPES.contains(&self.kind)
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct MessagePayload {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub(super) struct MessageBody<'a> {
    embeds: [EmbedPayload<'a>; 1],
    components: [ActionRowPayload<'a>; 1],
}

#[derive(Debug, Serialize)]
struct EmbedPayload<'a> {
    title: &'a str,
    description: &'a str,
    color: u32,
    fields: &'a [EmbedField],
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
}

#[derive(Debug, Serialize)]
struct ActionRowPayload<'a> {
    #[serde(rename = "type")]
    kind: u8,
    components: Vec<ButtonPayload<'a>>,
}

#[derive(Debug, Serialize)]
struct ButtonPayload<'a> {
    #[serde(rename = "type")]
    kind: u8,
    style: u8,
    label: &'a str,
    emoji: EmojiPayload<'a>,
    custom_id: &'a str,
    disabled: bool,
}

#[derive(Debug, Serialize)]
struct EmojiPayload<'a> {
    name: &'a str,
}

impl<'a> From<&'a MessageView> for MessageBody<'a> {
    fn from(view: &'a MessageView) -> Self {
        Self {
            embeds: [EmbedPayload {
                title: &view.embed.title,
                description: &view.embed.description,
                color: view.embed.color,
                fields: &view.embed.fields,
                timestamp: view.embed.timestamp,
            }],
            components: [ActionRowPayload {
                kind: ACTION_ROW,
                components: view.buttons.iter().map(ButtonPayload::from).collect(),
            }],
        }
    }
}

impl<'a> From<&'a ButtonView> for ButtonPayload<'a> {
    fn from(button: &'a ButtonView) -> Self {
        Self {
            kind: BUTTON,
            style: button.style as u8,
            label: &button.label,
            emoji: EmojiPayload {
                name: &button.emoji,
            },
            custom_id: &button.custom_id,
            disabled: button.disabled,
        }
    }
}
