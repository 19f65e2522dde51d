//! The lobby aggregate and every invariant-preserving mutation on it.
//!
//! All mutators are pure: they take the current instant explicitly and either
//! apply the whole change or leave the lobby untouched.

use std::num::NonZeroU32;

use indexmap::IndexSet;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    dao::{models::LobbyRecord, storage::StorageError},
    error::LobbyError,
    state::state_machine::{LobbyEvent, LobbyStatus},
};

/// Parameters accepted when opening a new lobby.
#[derive(Debug, Clone)]
pub struct NewLobby {
    pub guild_id: String,
    pub channel_id: String,
    pub creator_id: String,
    pub title: String,
    pub scheduled_start_time: Option<OffsetDateTime>,
    pub max_participants: Option<NonZeroU32>,
}

/// Field-level edit applied while a lobby is pending. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LobbyPatch {
    pub title: Option<String>,
    /// `Some(None)` clears the schedule.
    pub scheduled_start_time: Option<Option<OffsetDateTime>>,
    /// `Some(None)` removes the capacity bound.
    pub max_participants: Option<Option<NonZeroU32>>,
}

/// An ephemeral scrim event tied to a guild channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lobby {
    id: Uuid,
    guild_id: String,
    channel_id: String,
    message_id: Option<String>,
    creator_id: String,
    title: String,
    scheduled_start_time: Option<OffsetDateTime>,
    status: LobbyStatus,
    participants: IndexSet<String>,
    max_participants: Option<NonZeroU32>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl Lobby {
    /// Open a pending lobby with the creator as its only participant.
    pub fn open(new: NewLobby, now: OffsetDateTime) -> Self {
        let mut participants = IndexSet::new();
        participants.insert(new.creator_id.clone());

        Self {
            id: Uuid::new_v4(),
            guild_id: new.guild_id,
            channel_id: new.channel_id,
            message_id: None,
            creator_id: new.creator_id,
            title: new.title,
            scheduled_start_time: new.scheduled_start_time,
            status: LobbyStatus::Pending,
            participants,
            max_participants: new.max_participants,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn guild_id(&self) -> &str {
        &self.guild_id
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// Rendered message id once the first render has completed.
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn creator_id(&self) -> &str {
        &self.creator_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn scheduled_start_time(&self) -> Option<OffsetDateTime> {
        self.scheduled_start_time
    }

    pub fn status(&self) -> LobbyStatus {
        self.status
    }

    /// Participants in join order; the creator is always first.
    pub fn participants(&self) -> impl ExactSizeIterator<Item = &str> {
        self.participants.iter().map(String::as_str)
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn max_participants(&self) -> Option<NonZeroU32> {
        self.max_participants
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    pub fn updated_at(&self) -> OffsetDateTime {
        self.updated_at
    }

    /// Append `user_id` to the participant list.
    pub fn add_participant(&mut self, user_id: &str, now: OffsetDateTime) -> Result<(), LobbyError> {
        self.ensure_pending("join")?;

        if let Some(max) = self.max_participants {
            if self.participants.len() >= max.get() as usize {
                return Err(LobbyError::CapacityExceeded { max: max.get() });
            }
        }

        if self.participants.contains(user_id) {
            return Err(LobbyError::AlreadyParticipant(user_id.to_owned()));
        }

        self.participants.insert(user_id.to_owned());
        self.touch(now);
        Ok(())
    }

    /// Remove `user_id` from the participant list. The creator can never leave.
    pub fn remove_participant(
        &mut self,
        user_id: &str,
        now: OffsetDateTime,
    ) -> Result<(), LobbyError> {
        if user_id == self.creator_id {
            return Err(LobbyError::CreatorImmutable);
        }

        self.ensure_pending("leave")?;

        if !self.participants.shift_remove(user_id) {
            return Err(LobbyError::NotParticipant(user_id.to_owned()));
        }

        self.touch(now);
        Ok(())
    }

    /// Move a pending lobby to active once its scheduled time has been reached.
    pub fn start(&mut self, now: OffsetDateTime) -> Result<(), LobbyError> {
        let next = self
            .status
            .transition(LobbyEvent::Start)
            .map_err(|invalid| LobbyError::InvalidState {
                status: invalid.from,
                operation: "start",
            })?;

        if let Some(scheduled) = self.scheduled_start_time {
            if now < scheduled {
                return Err(LobbyError::TooEarly { scheduled });
            }
        }

        self.status = next;
        self.touch(now);
        Ok(())
    }

    /// Cancel the lobby from any non-terminal status.
    pub fn cancel(&mut self, now: OffsetDateTime) -> Result<(), LobbyError> {
        self.status = match self.status.transition(LobbyEvent::Cancel) {
            Ok(next) => next,
            Err(invalid) if invalid.from == LobbyStatus::Cancelled => {
                return Err(LobbyError::AlreadyCancelled);
            }
            Err(invalid) => {
                return Err(LobbyError::InvalidState {
                    status: invalid.from,
                    operation: "cancel",
                });
            }
        };
        self.touch(now);
        Ok(())
    }

    /// Mark an active lobby as finished.
    pub fn complete(&mut self, now: OffsetDateTime) -> Result<(), LobbyError> {
        self.status = self
            .status
            .transition(LobbyEvent::Complete)
            .map_err(|invalid| LobbyError::InvalidState {
                status: invalid.from,
                operation: "complete",
            })?;
        self.touch(now);
        Ok(())
    }

    /// Apply a title / schedule / capacity edit.
    pub fn apply_patch(&mut self, patch: LobbyPatch, now: OffsetDateTime) -> Result<(), LobbyError> {
        self.ensure_pending("update")?;

        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(LobbyError::InvalidInput("title must not be empty".into()));
            }
        }

        if let Some(Some(max)) = patch.max_participants {
            if (max.get() as usize) < self.participants.len() {
                return Err(LobbyError::CapacityExceeded { max: max.get() });
            }
        }

        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(scheduled) = patch.scheduled_start_time {
            self.scheduled_start_time = scheduled;
        }
        if let Some(max) = patch.max_participants {
            self.max_participants = max;
        }

        self.touch(now);
        Ok(())
    }

    /// Record the id of the message rendering this lobby. Rebinding to the same id is a no-op.
    pub fn bind_message(&mut self, message_id: &str, now: OffsetDateTime) -> Result<(), LobbyError> {
        match self.message_id.as_deref() {
            Some(existing) if existing == message_id => Ok(()),
            Some(existing) => Err(LobbyError::AlreadyBound(existing.to_owned())),
            None if message_id.is_empty() => {
                Err(LobbyError::InvalidInput("message id must not be empty".into()))
            }
            None => {
                self.message_id = Some(message_id.to_owned());
                self.touch(now);
                Ok(())
            }
        }
    }

    fn ensure_pending(&self, operation: &'static str) -> Result<(), LobbyError> {
        if self.status != LobbyStatus::Pending {
            return Err(LobbyError::InvalidState {
                status: self.status,
                operation,
            });
        }
        Ok(())
    }

    fn touch(&mut self, now: OffsetDateTime) {
        self.updated_at = now;
    }
}

impl From<&Lobby> for LobbyRecord {
    fn from(lobby: &Lobby) -> Self {
        Self {
            id: lobby.id,
            guild_id: lobby.guild_id.clone(),
            channel_id: lobby.channel_id.clone(),
            message_id: lobby.message_id.clone().unwrap_or_default(),
            creator_id: lobby.creator_id.clone(),
            title: lobby.title.clone(),
            scheduled_start_time: lobby.scheduled_start_time,
            status: lobby.status,
            participants: lobby.participants.iter().cloned().collect(),
            max_participants: lobby.max_participants.map(NonZeroU32::get),
            created_at: lobby.created_at,
            updated_at: lobby.updated_at,
        }
    }
}

/// A stored record that violates a lobby invariant.
#[derive(Debug, thiserror::Error)]
pub enum RecordViolation {
    #[error("creator `{0}` is missing from participants")]
    CreatorMissing(String),
    #[error("participant `{0}` is listed twice")]
    DuplicateParticipant(String),
    #[error("{count} participants exceed capacity {max}")]
    OverCapacity { count: usize, max: u32 },
}

impl TryFrom<LobbyRecord> for Lobby {
    type Error = StorageError;

    fn try_from(record: LobbyRecord) -> Result<Self, Self::Error> {
        let key = record.id.to_string();
        let mut participants = IndexSet::with_capacity(record.participants.len());
        for participant in record.participants {
            if !participants.insert(participant.clone()) {
                return Err(StorageError::corrupt(
                    key,
                    RecordViolation::DuplicateParticipant(participant),
                ));
            }
        }

        if !participants.contains(&record.creator_id) {
            return Err(StorageError::corrupt(
                key,
                RecordViolation::CreatorMissing(record.creator_id),
            ));
        }

        // A stored capacity of zero means "unbounded" for records written by older clients.
        let max_participants = record.max_participants.and_then(NonZeroU32::new);
        if let Some(max) = max_participants {
            if participants.len() > max.get() as usize {
                return Err(StorageError::corrupt(
                    key,
                    RecordViolation::OverCapacity {
                        count: participants.len(),
                        max: max.get(),
                    },
                ));
            }
        }

        Ok(Self {
            id: record.id,
            guild_id: record.guild_id,
            channel_id: record.channel_id,
            message_id: Some(record.message_id).filter(|id| !id.is_empty()),
            creator_id: record.creator_id,
            title: record.title,
            scheduled_start_time: record.scheduled_start_time,
            status: record.status,
            participants,
            max_participants,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use time::{Duration, macros::datetime};

    use super::*;

    const NOW: OffsetDateTime = datetime!(2026-05-10 20:00 UTC);

    fn open(max: Option<u32>) -> Lobby {
        Lobby::open(
            NewLobby {
                guild_id: "g1".into(),
                channel_id: "c1".into(),
                creator_id: "creator".into(),
                title: "Ranked 5v5".into(),
                scheduled_start_time: None,
                max_participants: max.and_then(NonZeroU32::new),
            },
            NOW,
        )
    }

    #[test]
    fn open_lobby_is_pending_with_creator_joined() {
        let lobby = open(None);
        assert_eq!(lobby.status(), LobbyStatus::Pending);
        assert_eq!(lobby.participants().collect::<Vec<_>>(), vec!["creator"]);
        assert_eq!(lobby.message_id(), None);
        assert_eq!(lobby.created_at(), lobby.updated_at());
    }

    #[test]
    fn join_refreshes_updated_at_and_keeps_order() {
        let mut lobby = open(None);
        let later = NOW + Duration::minutes(3);
        lobby.add_participant("b", later).unwrap();
        lobby.add_participant("a", later).unwrap();
        assert_eq!(
            lobby.participants().collect::<Vec<_>>(),
            vec!["creator", "b", "a"]
        );
        assert_eq!(lobby.updated_at(), later);
    }

    #[test]
    fn capacity_is_checked_before_duplicates() {
        let mut lobby = open(Some(1));
        let err = lobby.add_participant("creator", NOW).unwrap_err();
        assert!(matches!(err, LobbyError::CapacityExceeded { max: 1 }));
    }

    #[test]
    fn duplicate_join_is_rejected() {
        let mut lobby = open(None);
        let err = lobby.add_participant("creator", NOW).unwrap_err();
        assert!(matches!(err, LobbyError::AlreadyParticipant(user) if user == "creator"));
    }

    #[test]
    fn creator_cannot_leave_in_any_status() {
        let mut lobby = open(None);
        assert!(matches!(
            lobby.remove_participant("creator", NOW),
            Err(LobbyError::CreatorImmutable)
        ));
        lobby.cancel(NOW).unwrap();
        assert!(matches!(
            lobby.remove_participant("creator", NOW),
            Err(LobbyError::CreatorImmutable)
        ));
    }

    #[test]
    fn leaving_keeps_remaining_order() {
        let mut lobby = open(None);
        for user in ["a", "b", "c"] {
            lobby.add_participant(user, NOW).unwrap();
        }
        lobby.remove_participant("b", NOW).unwrap();
        assert_eq!(
            lobby.participants().collect::<Vec<_>>(),
            vec!["creator", "a", "c"]
        );
        assert!(matches!(
            lobby.remove_participant("b", NOW),
            Err(LobbyError::NotParticipant(_))
        ));
    }

    #[test]
    fn start_respects_schedule() {
        let mut lobby = open(None);
        lobby
            .apply_patch(
                LobbyPatch {
                    scheduled_start_time: Some(Some(NOW + Duration::hours(1))),
                    ..LobbyPatch::default()
                },
                NOW,
            )
            .unwrap();

        assert!(matches!(lobby.start(NOW), Err(LobbyError::TooEarly { .. })));
        assert_eq!(lobby.status(), LobbyStatus::Pending);

        lobby.start(NOW + Duration::hours(1)).unwrap();
        assert_eq!(lobby.status(), LobbyStatus::Active);
    }

    #[test]
    fn mutations_are_refused_once_active() {
        let mut lobby = open(None);
        lobby.start(NOW).unwrap();
        assert!(matches!(
            lobby.add_participant("x", NOW),
            Err(LobbyError::InvalidState { status: LobbyStatus::Active, .. })
        ));
        assert!(matches!(
            lobby.apply_patch(
                LobbyPatch {
                    title: Some("new".into()),
                    ..LobbyPatch::default()
                },
                NOW
            ),
            Err(LobbyError::InvalidState { .. })
        ));
        assert!(matches!(lobby.start(NOW), Err(LobbyError::InvalidState { .. })));
    }

    #[test]
    fn cancel_twice_reports_already_cancelled() {
        let mut lobby = open(None);
        lobby.start(NOW).unwrap();
        lobby.cancel(NOW).unwrap();
        let before = lobby.clone();
        assert!(matches!(lobby.cancel(NOW), Err(LobbyError::AlreadyCancelled)));
        assert_eq!(lobby, before);
    }

    #[test]
    fn completed_lobby_cannot_be_cancelled() {
        let mut lobby = open(None);
        lobby.start(NOW).unwrap();
        lobby.complete(NOW).unwrap();
        assert!(matches!(
            lobby.cancel(NOW),
            Err(LobbyError::InvalidState { status: LobbyStatus::Completed, .. })
        ));
    }

    #[test]
    fn shrinking_capacity_below_participants_is_refused() {
        let mut lobby = open(Some(4));
        lobby.add_participant("a", NOW).unwrap();
        lobby.add_participant("b", NOW).unwrap();

        let err = lobby
            .apply_patch(
                LobbyPatch {
                    max_participants: Some(NonZeroU32::new(2)),
                    ..LobbyPatch::default()
                },
                NOW,
            )
            .unwrap_err();
        assert!(matches!(err, LobbyError::CapacityExceeded { max: 2 }));
        assert_eq!(lobby.max_participants().map(NonZeroU32::get), Some(4));

        lobby
            .apply_patch(
                LobbyPatch {
                    max_participants: Some(None),
                    ..LobbyPatch::default()
                },
                NOW,
            )
            .unwrap();
        assert_eq!(lobby.max_participants(), None);
    }

    #[test]
    fn empty_title_is_invalid_input() {
        let mut lobby = open(None);
        let err = lobby
            .apply_patch(
                LobbyPatch {
                    title: Some("   ".into()),
                    ..LobbyPatch::default()
                },
                NOW,
            )
            .unwrap_err();
        assert!(matches!(err, LobbyError::InvalidInput(_)));
        assert_eq!(lobby.title(), "Ranked 5v5");
    }

    #[test]
    fn message_binding_is_write_once() {
        let mut lobby = open(None);
        lobby.cancel(NOW).unwrap();
        lobby.bind_message("m1", NOW).unwrap();
        lobby.bind_message("m1", NOW).unwrap();
        assert!(matches!(
            lobby.bind_message("m2", NOW),
            Err(LobbyError::AlreadyBound(existing)) if existing == "m1"
        ));
        assert_eq!(lobby.message_id(), Some("m1"));
    }

    #[test]
    fn record_round_trip_preserves_everything() {
        let mut lobby = open(Some(5));
        lobby.add_participant("a", NOW).unwrap();
        lobby.bind_message("m1", NOW).unwrap();

        let record = LobbyRecord::from(&lobby);
        assert_eq!(record.message_id, "m1");
        let restored = Lobby::try_from(record).unwrap();
        assert_eq!(restored, lobby);
    }

    #[test]
    fn record_without_creator_is_corrupt() {
        let mut record = LobbyRecord::from(&open(None));
        record.participants.clear();
        assert!(matches!(
            Lobby::try_from(record),
            Err(StorageError::Corrupt { .. })
        ));
    }
}
