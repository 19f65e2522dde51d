//! Boundary to the chat platform that renders lobbies as interactive messages.

#[cfg(feature = "discord-gateway")]
pub mod discord;
#[cfg(test)]
pub mod testing;

use std::error::Error;

use futures::future::BoxFuture;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

/// Result alias for gateway calls.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Failures reported by a chat gateway backend.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The platform could not be reached or answered with garbage.
    #[error("chat gateway unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The platform refused the request.
    #[error("chat gateway rejected `{path}` with status {status}")]
    Rejected { path: String, status: u16 },
    /// The target channel does not exist or cannot hold messages.
    #[error("channel `{channel_id}` is missing or not text based")]
    ChannelUnavailable { channel_id: String },
    /// The message to edit no longer exists.
    #[error("message `{message_id}` no longer exists")]
    MessageMissing { message_id: String },
}

impl GatewayError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        GatewayError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// Channel metadata needed before rendering into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: String,
    /// Whether messages can be posted in the channel.
    pub text_based: bool,
}

/// Operations consumed from the chat platform.
pub trait ChatGateway: Send + Sync {
    /// Look a channel up; `None` when it does not exist or is not visible.
    fn fetch_channel(&self, channel_id: String) -> BoxFuture<'static, GatewayResult<Option<ChannelInfo>>>;
    /// Post a new message and return its id.
    fn post_message(&self, channel_id: String, view: MessageView) -> BoxFuture<'static, GatewayResult<String>>;
    /// Replace the content of an existing message and return its id.
    fn edit_message(
        &self,
        channel_id: String,
        message_id: String,
        view: MessageView,
    ) -> BoxFuture<'static, GatewayResult<String>>;
}

/// A rendered lobby: one embed plus one row of buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub embed: EmbedView,
    pub buttons: Vec<ButtonView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedView {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonView {
    pub custom_id: String,
    pub label: String,
    pub emoji: String,
    pub style: ButtonStyle,
    pub disabled: bool,
}

/// Button colours, numbered like the platform's component styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary = 1,
    Secondary = 2,
    Success = 3,
    Danger = 4,
}
