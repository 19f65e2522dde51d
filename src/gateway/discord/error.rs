//! Error types of the Discord REST client.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias returning [`DiscordError`] failures.
pub type DiscordResult<T> = Result<T, DiscordError>;

/// Failures that can occur while calling the Discord API.
#[derive(Debug, Error)]
pub enum DiscordError {
    /// Building the HTTP client failed (invalid TLS setup, bad token header, etc).
    #[error("failed to build Discord client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// The bot token cannot be used as a header value.
    #[error("Discord token contains invalid header characters")]
    InvalidToken,
    /// A request could not be sent.
    #[error("failed to send Discord request to `{path}`")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// Discord returned an unexpected status code.
    #[error("unexpected Discord response status {status} for `{path}`")]
    RequestStatus { path: String, status: StatusCode },
    /// Response payload could not be parsed.
    #[error("failed to decode Discord response for `{path}`")]
    DecodeResponse {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The message to edit was deleted.
    #[error("Discord message `{message_id}` does not exist")]
    UnknownMessage { message_id: String },
}
