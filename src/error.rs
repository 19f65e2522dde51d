use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::error;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, state::state_machine::LobbyStatus};

/// Outcomes of lobby operations other than success.
///
/// Everything except [`LobbyError::StoreUnavailable`] is an expected, recoverable
/// result of validating a request against the current lobby state.
#[derive(Debug, Error)]
pub enum LobbyError {
    /// No live lobby has this id (never created, deleted, or expired).
    #[error("lobby `{0}` not found")]
    NotFound(Uuid),
    /// The lobby status does not allow the requested operation.
    #[error("cannot {operation} a lobby that is {status}")]
    InvalidState {
        /// Status the lobby was in.
        status: LobbyStatus,
        /// Operation that was refused.
        operation: &'static str,
    },
    /// The lobby already holds `max` participants.
    #[error("lobby is full ({max} participants)")]
    CapacityExceeded {
        /// Configured capacity.
        max: u32,
    },
    /// The user already joined.
    #[error("user `{0}` is already a participant")]
    AlreadyParticipant(String),
    /// The user never joined.
    #[error("user `{0}` is not a participant")]
    NotParticipant(String),
    /// The creator is pinned to the participant list.
    #[error("the creator cannot be removed from the lobby")]
    CreatorImmutable,
    /// Start requested before the scheduled start time.
    #[error("lobby cannot start before {scheduled}")]
    TooEarly {
        /// Scheduled start time.
        scheduled: OffsetDateTime,
    },
    /// Cancel requested twice.
    #[error("lobby is already cancelled")]
    AlreadyCancelled,
    /// The lobby is already rendered as a different message.
    #[error("lobby is already bound to message `{0}`")]
    AlreadyBound(String),
    /// Patch content is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The store could not be reached; nothing was written.
    #[error("lobby store unavailable")]
    StoreUnavailable(#[from] StorageError),
}

impl LobbyError {
    /// Whether this error is an expected validation outcome rather than an infrastructure fault.
    pub fn is_validation(&self) -> bool {
        !matches!(self, LobbyError::StoreUnavailable(_) | LobbyError::NotFound(_))
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<LobbyError> for AppError {
    fn from(err: LobbyError) -> Self {
        let message = err.to_string();
        match err {
            LobbyError::NotFound(_) => AppError::NotFound(message),
            LobbyError::InvalidInput(_)
            | LobbyError::NotParticipant(_)
            | LobbyError::CreatorImmutable => AppError::BadRequest(message),
            LobbyError::InvalidState { .. }
            | LobbyError::CapacityExceeded { .. }
            | LobbyError::AlreadyParticipant(_)
            | LobbyError::TooEarly { .. }
            | LobbyError::AlreadyCancelled
            | LobbyError::AlreadyBound(_) => AppError::Conflict(message),
            LobbyError::StoreUnavailable(source) => {
                error!(error = %source, "lobby store unavailable");
                AppError::ServiceUnavailable(message)
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
