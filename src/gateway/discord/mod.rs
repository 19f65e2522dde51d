//! Discord REST implementation of [`ChatGateway`](crate::gateway::ChatGateway).

mod client;
mod config;
mod error;
mod models;

pub use client::DiscordGateway;
pub use config::DiscordConfig;
pub use error::{DiscordError, DiscordResult};

use crate::gateway::GatewayError;

impl From<DiscordError> for GatewayError {
    fn from(err: DiscordError) -> Self {
        match err {
            DiscordError::UnknownMessage { message_id } => GatewayError::MessageMissing { message_id },
            DiscordError::RequestStatus { path, status } => GatewayError::Rejected {
                path,
                status: status.as_u16(),
            },
            other => GatewayError::unavailable(other.to_string(), other),
        }
    }
}
