use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to save lobby `{id}`")]
    SaveLobby {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load lobby `{id}`")]
    LoadLobby {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to list lobbies of guild `{guild_id}`")]
    ListGuild {
        guild_id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to resolve message `{message_id}`")]
    LoadMessage {
        message_id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete lobby `{id}`")]
    DeleteLobby {
        id: Uuid,
        #[source]
        source: MongoError,
    },
}
