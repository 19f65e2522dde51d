use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Lifecycle status of a lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LobbyStatus {
    /// Open for sign-ups; the only status in which the lobby can be edited.
    Pending,
    /// The creator started the scrim.
    Active,
    /// Called off by the creator. Terminal.
    Cancelled,
    /// Finished naturally. Terminal, only driven by external collaborators.
    Completed,
}

impl LobbyStatus {
    /// Whether no further transition can leave this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, LobbyStatus::Cancelled | LobbyStatus::Completed)
    }

    /// Lowercase wire name, identical to the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            LobbyStatus::Pending => "pending",
            LobbyStatus::Active => "active",
            LobbyStatus::Cancelled => "cancelled",
            LobbyStatus::Completed => "completed",
        }
    }

    /// Compute the status reached by applying `event`, if the transition is allowed.
    pub fn transition(self, event: LobbyEvent) -> Result<LobbyStatus, InvalidTransition> {
        let next = match (self, event) {
            (LobbyStatus::Pending, LobbyEvent::Start) => LobbyStatus::Active,
            (LobbyStatus::Pending | LobbyStatus::Active, LobbyEvent::Cancel) => {
                LobbyStatus::Cancelled
            }
            (LobbyStatus::Active, LobbyEvent::Complete) => LobbyStatus::Completed,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

impl std::fmt::Display for LobbyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events that move a lobby between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyEvent {
    /// Creator starts the scrim.
    Start,
    /// Creator calls the scrim off.
    Cancel,
    /// The scrim ran to its natural end.
    Complete,
}

/// Error returned when an event cannot be applied from the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while {from}")]
pub struct InvalidTransition {
    /// Status the lobby was in when the event was received.
    pub from: LobbyStatus,
    /// The rejected event.
    pub event: LobbyEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_start_or_cancel() {
        assert_eq!(
            LobbyStatus::Pending.transition(LobbyEvent::Start),
            Ok(LobbyStatus::Active)
        );
        assert_eq!(
            LobbyStatus::Pending.transition(LobbyEvent::Cancel),
            Ok(LobbyStatus::Cancelled)
        );
    }

    #[test]
    fn active_can_be_cancelled_or_completed() {
        assert_eq!(
            LobbyStatus::Active.transition(LobbyEvent::Cancel),
            Ok(LobbyStatus::Cancelled)
        );
        assert_eq!(
            LobbyStatus::Active.transition(LobbyEvent::Complete),
            Ok(LobbyStatus::Completed)
        );
    }

    #[test]
    fn active_cannot_start_again() {
        let err = LobbyStatus::Active
            .transition(LobbyEvent::Start)
            .unwrap_err();
        assert_eq!(err.from, LobbyStatus::Active);
        assert_eq!(err.event, LobbyEvent::Start);
    }

    #[test]
    fn terminal_statuses_reject_everything() {
        for status in [LobbyStatus::Cancelled, LobbyStatus::Completed] {
            assert!(status.is_terminal());
            for event in [LobbyEvent::Start, LobbyEvent::Cancel, LobbyEvent::Complete] {
                assert!(status.transition(event).is_err());
            }
        }
    }

    #[test]
    fn pending_cannot_complete() {
        assert!(LobbyStatus::Pending.transition(LobbyEvent::Complete).is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&LobbyStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
        let parsed: LobbyStatus = serde_json::from_str("\"active\"").unwrap();
        assert_eq!(parsed, LobbyStatus::Active);
    }
}
