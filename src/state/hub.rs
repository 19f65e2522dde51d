use tokio::sync::broadcast;
use uuid::Uuid;

use crate::state::lobby::Lobby;

/// What happened to a lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl ChangeKind {
    /// Event name used on the SSE stream.
    pub fn event_name(self) -> &'static str {
        match self {
            ChangeKind::Created => "lobby.created",
            ChangeKind::Updated => "lobby.updated",
            ChangeKind::Deleted => "lobby.deleted",
        }
    }
}

/// A committed lobby change. `lobby` is `None` for deletions.
#[derive(Debug, Clone)]
pub struct LobbyChange {
    pub kind: ChangeKind,
    pub lobby_id: Uuid,
    pub guild_id: String,
    pub lobby: Option<Lobby>,
}

/// Broadcast hub fanning committed lobby changes out to live subscribers.
pub struct LobbyHub {
    sender: broadcast::Sender<LobbyChange>,
}

impl LobbyHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent changes.
    pub fn subscribe(&self) -> broadcast::Receiver<LobbyChange> {
        self.sender.subscribe()
    }

    /// Publish a change that touched `lobby`.
    pub fn publish(&self, kind: ChangeKind, lobby: &Lobby) {
        let _ = self.sender.send(LobbyChange {
            kind,
            lobby_id: lobby.id(),
            guild_id: lobby.guild_id().to_owned(),
            lobby: Some(lobby.clone()),
        });
    }

    /// Publish the deletion of a lobby.
    pub fn publish_deleted(&self, lobby_id: Uuid, guild_id: &str) {
        let _ = self.sender.send(LobbyChange {
            kind: ChangeKind::Deleted,
            lobby_id,
            guild_id: guild_id.to_owned(),
            lobby: None,
        });
    }
}
